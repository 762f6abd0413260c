//! Bramble domain types.
//!
//! This crate holds the data model shared by the storage stack and the
//! layers above it:
//! - fixed-width crypto newtypes ([`Hash`], [`KeyImage`], [`PublicKey`], [`Signature`])
//! - blocks and transactions ([`Block`], [`Transaction`]) with their closed
//!   input/output sum types
//! - the binary wire codec ([`codec`]), including the var-int rules and
//!   variant tags that are part of the consensus contract
//! - hashing ([`cn_fast_hash`], [`tree_hash`]) and the derived block and
//!   transaction identities
//! - `extra` field parsing ([`extra`]): one-time tx pubkey, nonce payloads
//!   and alias registrations
//!
//! Everything here is deliberately free of storage and networking concerns.

mod block;
mod constants;
mod hash;
mod transaction;

pub mod codec;
pub mod extra;

pub use block::{Block, BlockHeader};
pub use codec::{ByteReader, MalformedBlob};
pub use constants::{BLOCK_MAJOR_VERSION_MAX, TRANSACTION_VERSION_MAX};
pub use extra::{AccountAddress, AliasRecord, ExtraInfo};
pub use hash::{cn_fast_hash, tree_hash, Hash, KeyImage, PublicKey, Signature};
pub use transaction::{Transaction, TransactionPrefix, TxIn, TxOut, TxOutTarget};
