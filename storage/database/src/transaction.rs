//! Database transaction abstraction; `trait TxRo`, `trait TxRw`.

//---------------------------------------------------------------------------------------------------- Import
use crate::error::RuntimeError;

//---------------------------------------------------------------------------------------------------- TxRo
/// Read-only database transaction.
///
/// Sees a consistent snapshot taken when the transaction began.
pub trait TxRo<'tx> {
    /// End the transaction.
    ///
    /// # Errors
    /// Backend-dependent; reads hold no dirty state, so this rarely fails.
    fn commit(self) -> Result<(), RuntimeError>;
}

//---------------------------------------------------------------------------------------------------- TxRw
/// Read/write database transaction.
///
/// At most one exists at a time. Dropping a `TxRw` without calling
/// [`TxRw::commit`] aborts it — abort is the default on every exit path.
pub trait TxRw<'tx> {
    /// Commit all writes atomically.
    ///
    /// After a successful commit the store is at the post-transaction
    /// state; after a failed one it is at the pre-transaction state.
    ///
    /// # Errors
    /// Fails on IO errors from the backend.
    fn commit(self) -> Result<(), RuntimeError>;

    /// Explicitly abort, discarding all writes.
    ///
    /// # Errors
    /// Fails on IO errors from the backend.
    fn abort(self) -> Result<(), RuntimeError>;
}
