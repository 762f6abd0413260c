//! Conversion of `redb`'s errors into this crate's error types.

//---------------------------------------------------------------------------------------------------- Import
use crate::error::{InitError, RuntimeError};

//---------------------------------------------------------------------------------------------------- InitError
impl From<redb::DatabaseError> for InitError {
    fn from(error: redb::DatabaseError) -> Self {
        use redb::DatabaseError as E;
        match error {
            E::DatabaseAlreadyOpen => Self::AlreadyOpen,
            E::RepairAborted => Self::Corrupt("repair aborted".to_string()),
            E::UpgradeRequired(version) => {
                Self::Corrupt(format!("file format upgrade required: {version}"))
            }
            E::Storage(redb::StorageError::Io(io)) => Self::Io(io),
            // `redb`'s errors are `#[non_exhaustive]`.
            other => Self::Corrupt(other.to_string()),
        }
    }
}

//---------------------------------------------------------------------------------------------------- RuntimeError
impl From<redb::StorageError> for RuntimeError {
    fn from(error: redb::StorageError) -> Self {
        match error {
            redb::StorageError::Io(io) => Self::Io(io),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<redb::TransactionError> for RuntimeError {
    fn from(error: redb::TransactionError) -> Self {
        match error {
            redb::TransactionError::Storage(storage) => storage.into(),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<redb::TableError> for RuntimeError {
    fn from(error: redb::TableError) -> Self {
        match error {
            redb::TableError::TableDoesNotExist(_) => Self::TableNotFound,
            redb::TableError::Storage(storage) => storage.into(),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<redb::CommitError> for RuntimeError {
    fn from(error: redb::CommitError) -> Self {
        match error {
            redb::CommitError::Storage(storage) => storage.into(),
            other => Self::Storage(other.to_string()),
        }
    }
}
