//! General constants used throughout `bramble-database`.

//---------------------------------------------------------------------------------------------------- Constants
/// The database file name inside the store's directory, e.g:
/// ```txt
/// ~/.local/share/bramble/
/// ├─ data.redb # <-
/// ├─ scratchpad.bin
/// ```
pub const DATABASE_DATA_FILENAME: &str = "data.redb";

/// Static string of the `crate` being used as the database backend.
pub const DATABASE_BACKEND: &str = "redb";
