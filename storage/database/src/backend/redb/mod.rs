//! `redb` backend.

mod database;
mod env;
mod error;
mod storable;
mod transaction;
mod types;

pub use env::ConcreteEnv;
