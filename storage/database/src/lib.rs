//! Transactional key-value abstraction over an embedded store.
//!
//! This crate defines the minimal capability surface the blockchain store
//! is built on:
//! - [`Env`]: an opened database environment, created from a [`config::Config`]
//! - [`EnvInner`]: transaction and table factory
//! - [`TxRo`]/[`TxRw`]: snapshot-consistent read and exclusive write
//!   transactions; an abandoned write transaction aborts, never commits
//! - [`DatabaseRo`]/[`DatabaseRw`]/[`DatabaseIter`]: typed operations on one
//!   [`Table`]
//! - [`Storable`]/[`Key`]: the (de)serialization contract for keys and values
//!
//! There is exactly one concrete backend, [`ConcreteEnv`], backed by `redb`.
//! Higher layers only ever name `ConcreteEnv` and the traits — swapping the
//! engine stays a one-crate change.
//!
//! # Concurrency
//! One writer at a time; readers are unbounded and each sees a consistent
//! snapshot taken when its transaction begins.

//---------------------------------------------------------------------------------------------------- Public API
pub mod config;

mod backend;
mod constants;
mod database;
mod env;
mod error;
mod key;
mod storable;
mod table;
mod transaction;

pub use backend::ConcreteEnv;
pub use constants::{DATABASE_BACKEND, DATABASE_DATA_FILENAME};
pub use database::{DatabaseIter, DatabaseRo, DatabaseRw};
pub use env::{Env, EnvInner};
pub use error::{InitError, RuntimeError};
pub use key::{Key, KeyCompare};
pub use storable::{Storable, StorableString, StorableVec};
pub use table::Table;
pub use transaction::{TxRo, TxRw};
