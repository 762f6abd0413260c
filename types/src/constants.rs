//! Compiled protocol maximums.

/// Highest block `major_version` this build understands.
///
/// Decoding a block header with a greater version fails: the node cannot
/// interpret post-fork consensus data and must not store it.
pub const BLOCK_MAJOR_VERSION_MAX: u8 = 1;

/// Highest transaction `version` this build understands.
pub const TRANSACTION_VERSION_MAX: u64 = 1;
