//! Database tables.
//!
//! The typed index set layered over [`bramble_database`]. Variable-width
//! blobs (block/tx bodies, alias records) are split from their fixed-width
//! `Pod` metadata so the metadata rows stay zero-copy.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{
    EnvInner, RuntimeError, StorableString, StorableVec, Table, TxRo, TxRw,
};

use crate::types::{
    Amount, AmountIndex, BlockHash, BlockHeight, BlockInfo, KeyImage, OutputId, OutputInfo,
    ScratchpadEntry, TxHash, TxId, TxInfo,
};

//---------------------------------------------------------------------------------------------------- Table macro
/// Create a zero-sized table struct and implement [`Table`] on it.
macro_rules! tables {
    (
        $(
            $(#[$attr:meta])*
            $table:ident: ($name:literal) $key:ty => $value:ty,
        )*
    ) => {
        $(
            $(#[$attr])*
            #[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
            pub struct $table;

            impl Table for $table {
                const NAME: &'static str = $name;
                type Key = $key;
                type Value = $value;
            }
        )*

        /// Create every table that does not yet exist.
        ///
        /// Called once per [`open`](crate::Blockchain::open); after this,
        /// opening any table read-only cannot fail with
        /// [`RuntimeError::TableNotFound`].
        pub fn create_all_tables<'env, Ro, Rw>(
            env_inner: &impl EnvInner<'env, Ro, Rw>,
            tx_rw: &Rw,
        ) -> Result<(), RuntimeError>
        where
            Ro: TxRo<'env>,
            Rw: TxRw<'env>,
        {
            $(
                env_inner.create_db::<$table>(tx_rw)?;
            )*
            Ok(())
        }
    };
}

//---------------------------------------------------------------------------------------------------- Tables
tables! {
    /// Serialized block bodies, keyed by height.
    ///
    /// Keys are contiguous over `[0, height)`; this table is the canonical
    /// chain — every other table can be rebuilt from it.
    BlockBlobs: ("block_blobs") BlockHeight => StorableVec<u8>,

    /// Per-block metadata, keyed by height; see [`BlockInfo`].
    BlockInfos: ("block_infos") BlockHeight => BlockInfo,

    /// Block hash to height; a bijection with [`BlockBlobs`]'s keys.
    BlockHeights: ("block_heights") BlockHash => BlockHeight,

    /// Per-transaction metadata, keyed by transaction hash.
    ///
    /// Every transaction referenced by a stored block is present; there
    /// are no orphans.
    TxInfos: ("tx_infos") TxHash => TxInfo,

    /// Serialized transaction bodies, keyed by dense row id.
    TxBlobs: ("tx_blobs") TxId => StorableVec<u8>,

    /// Per-output global (per-amount) indices of a transaction, in output
    /// order. The slice length equals the transaction's output count.
    TxOutputIndices: ("tx_output_indices") TxId => StorableVec<u64>,

    /// The per-amount output index: `(amount, index)` to output location.
    ///
    /// For every amount the populated indices are dense from 0; inserts
    /// append, removals take the maximum.
    Outputs: ("outputs") OutputId => OutputInfo,

    /// Number of outputs recorded per amount; the allocator for
    /// [`Outputs`] indices. Absent amount means zero.
    NumOutputs: ("num_outputs") Amount => AmountIndex,

    /// Spent key images. Presence is the value; membership means some
    /// stored transaction spends this image.
    KeyImages: ("key_images") KeyImage => (),

    /// Alias registrations by name, first-writer-wins. Values are encoded
    /// [`AliasRecord`](bramble_types::AliasRecord)s.
    Aliases: ("aliases") StorableString => StorableVec<u8>,

    /// The mining scratchpad, one 32-byte entry per index over
    /// `[0, scratchpad_len)`.
    Scratchpad: ("scratchpad") u64 => ScratchpadEntry,

    /// Chain-level metadata, keyed by name; see
    /// [`ops::property`](crate::ops::property).
    Metadata: ("metadata") StorableString => StorableVec<u8>,
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use super::*;

    /// Table names are part of the on-disk format.
    #[test]
    fn table_names_are_unique_and_stable() {
        let names = [
            BlockBlobs::NAME,
            BlockInfos::NAME,
            BlockHeights::NAME,
            TxInfos::NAME,
            TxBlobs::NAME,
            TxOutputIndices::NAME,
            Outputs::NAME,
            NumOutputs::NAME,
            KeyImages::NAME,
            Aliases::NAME,
            Scratchpad::NAME,
            Metadata::NAME,
        ];
        let set: std::collections::HashSet<&str> = names.iter().copied().collect();
        assert_eq!(set.len(), names.len());
        assert_eq!(BlockBlobs::NAME, "block_blobs");
        assert_eq!(KeyImages::NAME, "key_images");
    }
}
