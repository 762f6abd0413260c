//! Table key/value types.
//!
//! Fixed-width values are `bytemuck::Pod` structs so they can be cast
//! to/from database bytes without a serialization step. Anything holding a
//! `u128` is split into low/high `u64` halves — a `u128` field would force
//! 16-byte alignment and padding, which `Pod` forbids.

//---------------------------------------------------------------------------------------------------- Import
use std::cmp::Ordering;

use bytemuck::{Pod, Zeroable};

use bramble_database::{Key, KeyCompare};

//---------------------------------------------------------------------------------------------------- Aliases
/// A block's position in the chain, starting at 0.
pub type BlockHeight = u64;

/// A monotonically increasing transaction row id; dense `0..tx_count`.
pub type TxId = u64;

/// An output amount in atomic units.
pub type Amount = u64;

/// The dense per-amount index of an output.
pub type AmountIndex = u64;

/// A block hash in raw table form.
pub type BlockHash = [u8; 32];

/// A transaction hash in raw table form.
pub type TxHash = [u8; 32];

/// A key image in raw table form.
pub type KeyImage = [u8; 32];

/// One scratchpad entry in raw table form.
pub type ScratchpadEntry = [u8; 32];

//---------------------------------------------------------------------------------------------------- u128 halves
/// Split a `u128` into `(low, high)` `u64` halves.
#[allow(clippy::cast_possible_truncation)] // both casts keep exactly 64 bits
pub(crate) const fn split_u128(value: u128) -> (u64, u64) {
    (value as u64, (value >> 64) as u64)
}

/// Combine `(low, high)` `u64` halves back into a `u128`.
pub(crate) const fn combine_u128(low: u64, high: u64) -> u128 {
    ((high as u128) << 64) | (low as u128)
}

//---------------------------------------------------------------------------------------------------- BlockInfo
/// Per-block metadata stored alongside the block blob.
///
/// `scratch_offset` is the scratchpad length immediately before the block
/// was applied; it makes the scratchpad patch exactly reversible on pop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct BlockInfo {
    /// Serialized size of the block and its transactions.
    pub block_size: u64,
    /// Low 64 bits of the cumulative difficulty up to this block.
    pub cumulative_difficulty_low: u64,
    /// High 64 bits of the cumulative difficulty.
    pub cumulative_difficulty_high: u64,
    /// Total coins emitted up to and including this block.
    pub coins_generated: u64,
    /// Total coins donated up to and including this block.
    pub coins_donated: u64,
    /// Scratchpad length before this block's append.
    pub scratch_offset: u64,
    /// The block's identity hash.
    pub block_hash: BlockHash,
}

impl BlockInfo {
    /// The cumulative difficulty as one number.
    pub const fn cumulative_difficulty(&self) -> u128 {
        combine_u128(
            self.cumulative_difficulty_low,
            self.cumulative_difficulty_high,
        )
    }
}

//---------------------------------------------------------------------------------------------------- TxInfo
/// Per-transaction metadata, keyed by transaction hash.
///
/// The transaction body itself lives in the blob table under
/// [`TxInfo::tx_id`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct TxInfo {
    /// Row id of the transaction blob.
    pub tx_id: TxId,
    /// The transaction's unlock time.
    pub unlock_time: u64,
    /// Hash of the block this transaction is stored in.
    pub block_hash: BlockHash,
}

//---------------------------------------------------------------------------------------------------- Outputs
/// Composite key of the per-amount output index: `(amount, index)`.
///
/// Ordered by amount, then index, so the indices of one amount form a
/// contiguous key range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct OutputId {
    /// The output's amount.
    pub amount: Amount,
    /// The dense index within `amount`.
    pub amount_index: AmountIndex,
}

impl Key for OutputId {
    const KEY_COMPARE: KeyCompare = KeyCompare::Custom(compare_output_id);
}

/// Order serialized [`OutputId`]s by `(amount, amount_index)`.
fn compare_output_id(left: &[u8], right: &[u8]) -> Ordering {
    let id = |bytes: &[u8]| -> (u64, u64) {
        let mut low = [0; 8];
        let mut high = [0; 8];
        low.copy_from_slice(&bytes[..8]);
        high.copy_from_slice(&bytes[8..16]);
        (u64::from_le_bytes(low), u64::from_le_bytes(high))
    };
    id(left).cmp(&id(right))
}

/// What an output index entry points at.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct OutputInfo {
    /// Hash of the transaction that created the output.
    pub tx_hash: TxHash,
    /// The output's position inside that transaction.
    pub local_index: u64,
    /// The transaction's unlock time, denormalized for ring sampling.
    pub unlock_time: u64,
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// `Pod` types must have no padding; sizes are part of the disk format.
    #[test]
    fn pod_sizes() {
        assert_eq!(std::mem::size_of::<BlockInfo>(), 80);
        assert_eq!(std::mem::size_of::<TxInfo>(), 48);
        assert_eq!(std::mem::size_of::<OutputId>(), 16);
        assert_eq!(std::mem::size_of::<OutputInfo>(), 48);
    }

    #[test]
    fn u128_halves_roundtrip() {
        for value in [0u128, 1, u128::from(u64::MAX), u128::from(u64::MAX) + 1, u128::MAX] {
            let (low, high) = split_u128(value);
            assert_eq!(combine_u128(low, high), value);
        }
    }

    #[test]
    fn output_ids_order_by_amount_then_index() {
        use bramble_database::Storable as _;

        let ordered = [
            OutputId { amount: 1, amount_index: 0 },
            OutputId { amount: 1, amount_index: 1 },
            OutputId { amount: 1, amount_index: 256 },
            OutputId { amount: 2, amount_index: 0 },
            OutputId { amount: 300, amount_index: 7 },
        ];
        for pair in ordered.windows(2) {
            assert_eq!(
                compare_output_id(pair[0].as_bytes(), pair[1].as_bytes()),
                Ordering::Less,
            );
        }
    }
}
