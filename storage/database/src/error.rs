//! Database error types.

//---------------------------------------------------------------------------------------------------- InitError
/// Errors that occur during [`Env::open`](crate::Env::open).
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    /// An IO error occurred creating or opening the database files.
    #[error("database file IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The database is already open (this process or another holds it).
    #[error("database is already open")]
    AlreadyOpen,

    /// The database file exists but could not be interpreted.
    #[error("database is corrupt: {0}")]
    Corrupt(String),
}

//---------------------------------------------------------------------------------------------------- RuntimeError
/// Errors that occur inside an already-open [`Env`](crate::Env).
///
/// Transient IO errors are reported, not retried — retry policy belongs to
/// the caller.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    /// The key already existed in the table.
    #[error("key already existed in the database")]
    KeyExists,

    /// The key did not exist in the table.
    #[error("key/value pair was not found in the database")]
    KeyNotFound,

    /// The operation was attempted against a table that does not exist.
    #[error("table was not found in the database")]
    TableNotFound,

    /// An IO error from the backend.
    #[error("database IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend reported inconsistent on-disk state.
    #[error("database storage error: {0}")]
    Storage(String),
}
