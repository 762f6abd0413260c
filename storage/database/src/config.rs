//! Database [`Env`](crate::Env) configuration.
//!
//! The main [`Config`] struct passed to [`Env::open`](crate::Env::open),
//! plus the sync profile and open-flag types derived from it.

//---------------------------------------------------------------------------------------------------- Import
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use crate::constants::DATABASE_DATA_FILENAME;

//---------------------------------------------------------------------------------------------------- SyncMode
/// Disk synchronization profile.
///
/// All three are *correct*: a crash never corrupts previously synced state.
/// They differ only in how much recently-acknowledged data a crash may
/// lose.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SyncMode {
    /// Fully sync to disk on every commit. Loses nothing.
    #[default]
    Safe,

    /// Acknowledge before the metadata sync. A crash may lose the last
    /// few commits.
    Fast,

    /// Acknowledge before any sync. A crash may lose everything since the
    /// last explicit [`Env::sync`](crate::Env::sync).
    Fastest,
}

//---------------------------------------------------------------------------------------------------- OpenFlags
bitflags::bitflags! {
    /// Environment open flags.
    ///
    /// The knobs recognized by embedded engines in general; which ones a
    /// concrete backend can honor is backend-specific (`redb` derives its
    /// per-transaction durability from the sync-related bits and ignores
    /// the mapping hints).
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct OpenFlags: u32 {
        /// Create the database files when missing.
        const CREATE_IF_MISSING = 1 << 0;
        /// Sync data on every commit.
        const DURABLE_WRITES    = 1 << 1;
        /// Acknowledge writes before any sync reaches disk.
        const ASYNC_WRITES      = 1 << 2;
        /// Disable OS readahead on the data file.
        const NO_READAHEAD      = 1 << 3;
        /// Write through a writable memory map.
        const MMAP_WRITES       = 1 << 4;
        /// Sync metadata pages eagerly.
        const SYNC_METADATA     = 1 << 5;
    }
}

impl OpenFlags {
    /// The flag set a sync profile expands to.
    pub const fn from_sync_mode(sync_mode: SyncMode) -> Self {
        match sync_mode {
            SyncMode::Safe => Self::CREATE_IF_MISSING
                .union(Self::DURABLE_WRITES)
                .union(Self::SYNC_METADATA)
                .union(Self::NO_READAHEAD),
            SyncMode::Fast => Self::CREATE_IF_MISSING.union(Self::NO_READAHEAD),
            SyncMode::Fastest => Self::CREATE_IF_MISSING
                .union(Self::ASYNC_WRITES)
                .union(Self::MMAP_WRITES)
                .union(Self::NO_READAHEAD),
        }
    }
}

//---------------------------------------------------------------------------------------------------- Config
/// Database [`Env`](crate::Env) configuration.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    // These are private: the file PATH is derived from the directory at
    // construction and the pair must stay consistent.
    pub(crate) db_directory: Cow<'static, Path>,
    pub(crate) db_file: Cow<'static, Path>,

    /// Disk synchronization profile.
    pub sync_mode: SyncMode,

    /// Open flags, derived from `sync_mode` unless overridden.
    pub flags: OpenFlags,
}

impl Config {
    fn with_sync_mode(db_directory: PathBuf, sync_mode: SyncMode) -> Self {
        let mut db_file = db_directory.clone();
        db_file.push(DATABASE_DATA_FILENAME);
        Self {
            db_directory: Cow::Owned(db_directory),
            db_file: Cow::Owned(db_file),
            sync_mode,
            flags: OpenFlags::from_sync_mode(sync_mode),
        }
    }

    /// Create a new [`Config`] with safe default settings.
    ///
    /// `db_directory` is the directory that will contain all database
    /// files; it is created on open if [`OpenFlags::CREATE_IF_MISSING`] is
    /// set (it is, for every constructor here).
    pub fn new(db_directory: PathBuf) -> Self {
        Self::with_sync_mode(db_directory, SyncMode::Safe)
    }

    /// Create a [`Config`] trading some durability for throughput.
    pub fn fast(db_directory: PathBuf) -> Self {
        Self::with_sync_mode(db_directory, SyncMode::Fast)
    }

    /// Create a [`Config`] trading the most durability for the most
    /// throughput.
    pub fn fastest(db_directory: PathBuf) -> Self {
        Self::with_sync_mode(db_directory, SyncMode::Fastest)
    }

    /// The absolute or relative path of the database directory.
    pub fn db_directory(&self) -> &Path {
        &self.db_directory
    }

    /// The path of the database data file inside [`Config::db_directory`].
    pub fn db_file(&self) -> &Path {
        &self.db_file
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn file_lives_inside_directory() {
        let config = Config::new(PathBuf::from("/tmp/chain"));
        assert_eq!(config.db_directory(), Path::new("/tmp/chain"));
        assert_eq!(
            config.db_file(),
            Path::new("/tmp/chain").join(DATABASE_DATA_FILENAME),
        );
    }

    #[test]
    fn profiles_expand_to_flag_sets() {
        let safe = OpenFlags::from_sync_mode(SyncMode::Safe);
        assert!(safe.contains(OpenFlags::DURABLE_WRITES | OpenFlags::SYNC_METADATA));
        assert!(!safe.contains(OpenFlags::ASYNC_WRITES));

        let fastest = OpenFlags::from_sync_mode(SyncMode::Fastest);
        assert!(fastest.contains(OpenFlags::ASYNC_WRITES | OpenFlags::MMAP_WRITES));
        assert!(!fastest.contains(OpenFlags::DURABLE_WRITES));

        for mode in [SyncMode::Safe, SyncMode::Fast, SyncMode::Fastest] {
            assert!(OpenFlags::from_sync_mode(mode).contains(OpenFlags::CREATE_IF_MISSING));
        }
    }
}
