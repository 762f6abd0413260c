//! Bramble's blockchain database.
//!
//! This crate is the persistent storage engine of the node: it accepts
//! validated blocks with their transactions, durably indexes them inside a
//! [`bramble_database`] environment, maintains the auxiliary indices needed
//! to answer node queries (spent key images, per-amount output indices,
//! transactions by hash, blocks by height/hash, the alias registry), and
//! maintains the mining [`scratchpad`] — the append-only hash buffer that
//! participates in proof-of-work.
//!
//! Consensus rule evaluation, signature verification, networking, mining
//! and mempool management all live elsewhere; this crate trusts that the
//! blocks it is handed were validated and only enforces the *storage*
//! invariants: no double-spent key image, strictly monotonic height, dense
//! per-amount output indices, and the exact reversibility of every append.
//!
//! The main entry point is [`Blockchain`]:
//!
//! ```rust,no_run
//! use bramble_blockchain::{Blockchain, StoreConfig};
//!
//! # fn main() -> Result<(), bramble_blockchain::StoreError> {
//! let chain = Blockchain::open(StoreConfig::new("/var/lib/bramble".into()))?;
//! println!("height: {}", chain.height()?);
//! # Ok(()) }
//! ```

//---------------------------------------------------------------------------------------------------- Public API
pub mod bootstrap;
pub mod config;
pub mod ops;
pub mod scratchpad;
pub mod tables;
pub mod types;

mod constants;
mod error;
mod store;

pub use config::{StoreConfig, WriteAck};
pub use constants::SCRATCHPAD_FILENAME;
pub use error::StoreError;
pub use store::{Blockchain, RandomAmountOuts, RandomOut, RandomOutsRequest, Stats};

// Re-exported so callers don't need a direct `bramble-database` dependency
// for the common cases.
pub use bramble_database::config::SyncMode;
