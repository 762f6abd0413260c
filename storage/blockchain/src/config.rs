//! Store configuration.

//---------------------------------------------------------------------------------------------------- Import
use std::path::PathBuf;

use bramble_database::config::{Config as DbConfig, SyncMode};

//---------------------------------------------------------------------------------------------------- WriteAck
/// When block appends are acknowledged relative to disk syncs.
///
/// Only meaningful under the [`SyncMode::Fast`]/[`SyncMode::Fastest`]
/// profiles: `Sync` issues an explicit environment sync every
/// [`StoreConfig::blocks_per_sync`] appended blocks, `Async` leaves
/// flushing entirely to the engine (and the final sync on close).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WriteAck {
    /// Periodic explicit syncs.
    #[default]
    Sync,
    /// No explicit syncs outside shutdown.
    Async,
}

//---------------------------------------------------------------------------------------------------- StoreConfig
/// Configuration of a [`Blockchain`](crate::Blockchain) store.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreConfig {
    /// Directory holding the database files and `scratchpad.bin`.
    pub db_path: PathBuf,

    /// Disk synchronization profile.
    pub sync_mode: SyncMode,

    /// Write acknowledgement policy; see [`WriteAck`].
    pub write_ack: WriteAck,

    /// Blocks appended between explicit syncs under the faster profiles.
    /// Clamped to `1..=5000`.
    pub blocks_per_sync: u64,

    /// Run the parallel integrity pre-pass during bootstrap import.
    pub fast_sync: bool,

    /// Worker threads for the bootstrap pre-pass.
    pub prep_threads: u32,

    /// Remove engine side logs on open. Accepted for configuration
    /// compatibility; the current backend keeps no side logs.
    pub auto_remove_logs: bool,
}

/// Upper bound on [`StoreConfig::blocks_per_sync`].
pub const BLOCKS_PER_SYNC_MAX: u64 = 5000;

/// Default for [`StoreConfig::blocks_per_sync`].
pub const BLOCKS_PER_SYNC_DEFAULT: u64 = 1000;

/// Default for [`StoreConfig::prep_threads`].
pub const PREP_THREADS_DEFAULT: u32 = 16;

impl StoreConfig {
    /// A safe-profile configuration rooted at `db_path`.
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            sync_mode: SyncMode::Safe,
            write_ack: WriteAck::Sync,
            blocks_per_sync: BLOCKS_PER_SYNC_DEFAULT,
            fast_sync: false,
            prep_threads: PREP_THREADS_DEFAULT,
            auto_remove_logs: false,
        }
    }

    /// The fastest profile: `fastest:async:1000`, integrity pre-pass on.
    pub fn fastest(db_path: PathBuf) -> Self {
        Self {
            sync_mode: SyncMode::Fastest,
            write_ack: WriteAck::Async,
            fast_sync: true,
            ..Self::new(db_path)
        }
    }

    /// `blocks_per_sync` with the `1..=5000` clamp applied.
    pub fn blocks_per_sync_clamped(&self) -> u64 {
        self.blocks_per_sync.clamp(1, BLOCKS_PER_SYNC_MAX)
    }

    /// The database-layer configuration this store config expands to.
    pub(crate) fn db_config(&self) -> DbConfig {
        match self.sync_mode {
            SyncMode::Safe => DbConfig::new(self.db_path.clone()),
            SyncMode::Fast => DbConfig::fast(self.db_path.clone()),
            SyncMode::Fastest => DbConfig::fastest(self.db_path.clone()),
        }
    }
}
