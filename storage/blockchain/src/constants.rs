//! General constants used throughout `bramble-blockchain`.

/// The scratchpad export file inside the store's directory, e.g:
/// ```txt
/// ~/.local/share/bramble/
/// ├─ data.redb
/// ├─ scratchpad.bin # <-
/// ```
///
/// Layout: `len: u64 LE` followed by `len × 32` bytes.
pub const SCRATCHPAD_FILENAME: &str = "scratchpad.bin";

/// Bootstrap stream format version this build writes.
pub(crate) const BOOTSTRAP_MAJOR_VERSION: u8 = 1;

/// Bootstrap stream minor version.
pub(crate) const BOOTSTRAP_MINOR_VERSION: u8 = 0;
