//! Chain-level metadata: the `metadata` table.
//!
//! Named POD slots: `height`, `top_block_hash`, `cumulative_difficulty`,
//! `coins_generated`, `coins_donated`, `scratchpad_len`. All are written
//! in the same transaction as the state they describe.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{
    DatabaseRo, DatabaseRw, RuntimeError, Storable, StorableString, StorableVec,
};

use crate::tables::Metadata;

//---------------------------------------------------------------------------------------------------- Keys
/// Current chain height == number of stored blocks.
pub const HEIGHT: &str = "height";
/// Hash of the top block; all zero on an empty chain.
pub const TOP_BLOCK_HASH: &str = "top_block_hash";
/// Cumulative difficulty of the top block.
pub const CUMULATIVE_DIFFICULTY: &str = "cumulative_difficulty";
/// Total coins emitted.
pub const COINS_GENERATED: &str = "coins_generated";
/// Total coins donated.
pub const COINS_DONATED: &str = "coins_donated";
/// Current scratchpad length, in entries.
pub const SCRATCHPAD_LEN: &str = "scratchpad_len";

//---------------------------------------------------------------------------------------------------- Accessors
/// Read the POD slot `key`.
///
/// # Errors
/// [`RuntimeError::KeyNotFound`] if the slot was never written,
/// [`RuntimeError::Storage`] if the stored bytes have the wrong width.
pub fn get_pod<T: Storable>(
    metadata: &impl DatabaseRo<Metadata>,
    key: &str,
) -> Result<T, RuntimeError> {
    let bytes = metadata.get(&StorableString::from(key))?;
    if T::BYTE_LENGTH.is_some_and(|len| len != bytes.len()) {
        return Err(RuntimeError::Storage(format!(
            "metadata slot `{key}` has the wrong width"
        )));
    }
    Ok(T::from_bytes(&bytes))
}

/// Write the POD slot `key`.
///
/// # Errors
/// IO errors.
pub fn set_pod<T: Storable>(
    metadata: &mut impl DatabaseRw<Metadata>,
    key: &str,
    value: &T,
) -> Result<(), RuntimeError> {
    metadata.put(
        &StorableString::from(key),
        &StorableVec(value.as_bytes().to_vec()),
    )
}

/// Initialize every slot that is still missing to its zero value.
///
/// Runs once per store open so that readers never observe an absent slot.
///
/// # Errors
/// IO errors.
pub fn init_defaults(metadata: &mut impl DatabaseRw<Metadata>) -> Result<(), RuntimeError> {
    if !metadata.contains(&StorableString::from(HEIGHT))? {
        set_pod(metadata, HEIGHT, &0u64)?;
        set_pod(metadata, TOP_BLOCK_HASH, &[0u8; 32])?;
        set_pod(metadata, CUMULATIVE_DIFFICULTY, &0u128)?;
        set_pod(metadata, COINS_GENERATED, &0u64)?;
        set_pod(metadata, COINS_DONATED, &0u64)?;
        set_pod(metadata, SCRATCHPAD_LEN, &0u64)?;
    }
    Ok(())
}

/// The current chain height.
///
/// # Errors
/// Database errors; the slot always exists on an opened store.
pub fn chain_height(metadata: &impl DatabaseRo<Metadata>) -> Result<u64, RuntimeError> {
    get_pod(metadata, HEIGHT)
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    // Exercised end-to-end through the store tests; the width guard is the
    // only logic worth pinning here and it needs a live table, covered in
    // `backend` tests of the database crate.
}
