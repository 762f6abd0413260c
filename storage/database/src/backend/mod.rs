//! The concrete database backend.
//!
//! `redb` is the only backend; everything above talks to it through the
//! traits in this crate so the engine stays swappable.

mod redb;

pub use redb::ConcreteEnv;

#[cfg(test)]
mod tests;
