//! The alias registry.
//!
//! Aliases are harvested from coinbase `extra` fields on append. Duplicate
//! names are first-writer-wins: a later registration of a taken name is
//! silently ignored. Each stored value carries the hash of the block that
//! introduced it, so popping a block removes an alias only if that block
//! actually registered it — append followed by pop stays an exact
//! inverse even when two blocks register identical records.
//!
//! Stored value layout: `introducer block hash (32 bytes) || record`.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{DatabaseRo, DatabaseRw, RuntimeError, StorableString, StorableVec};
use bramble_types::{AliasRecord, ByteReader, Hash};

use crate::{error::StoreError, tables::Aliases};

//---------------------------------------------------------------------------------------------------- Free functions
/// Register an alias introduced by `block_hash`. Returns `true` if the
/// name was actually written, `false` if it was already taken.
///
/// # Errors
/// Database errors.
pub fn add_alias(
    aliases: &mut impl DatabaseRw<Aliases>,
    record: &AliasRecord,
    block_hash: &Hash,
) -> Result<bool, StoreError> {
    let name = StorableString::from(record.name.as_str());
    if aliases.contains(&name)? {
        return Ok(false);
    }
    let mut blob = Vec::with_capacity(32 + 64);
    blob.extend_from_slice(block_hash.as_bytes());
    record.write(&mut blob);
    aliases.put(&name, &StorableVec(blob))?;
    Ok(true)
}

/// Remove `name`, but only if the stored registration was introduced by
/// `block_hash` — i.e. only while popping the block that registered it.
///
/// # Errors
/// Database errors, or [`StoreError::MalformedBlob`] if the stored value
/// is corrupt.
pub fn remove_alias_if_introduced(
    aliases: &mut impl DatabaseRw<Aliases>,
    name: &str,
    block_hash: &Hash,
) -> Result<(), StoreError> {
    match get_alias_entry(aliases, name)? {
        Some((introducer, _)) if &introducer == block_hash => {
            aliases.delete(&StorableString::from(name))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Look up an alias by name.
///
/// # Errors
/// Database errors, or [`StoreError::MalformedBlob`] if the stored value
/// is corrupt.
pub fn get_alias(
    aliases: &impl DatabaseRo<Aliases>,
    name: &str,
) -> Result<Option<AliasRecord>, StoreError> {
    Ok(get_alias_entry(aliases, name)?.map(|(_, record)| record))
}

/// Look up an alias with its introducing block hash.
fn get_alias_entry(
    aliases: &impl DatabaseRo<Aliases>,
    name: &str,
) -> Result<Option<(Hash, AliasRecord)>, StoreError> {
    let blob = match aliases.get(&StorableString::from(name)) {
        Ok(blob) => blob,
        Err(RuntimeError::KeyNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut r = ByteReader::new(&blob);
    let introducer = Hash(r.read_array()?);
    let record = AliasRecord::read(&mut r)?;
    r.finish()?;
    Ok(Some((introducer, record)))
}
