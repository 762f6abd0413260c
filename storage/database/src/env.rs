//! Abstracted database environment; `trait Env`.

//---------------------------------------------------------------------------------------------------- Import
use crate::{
    config::Config,
    database::{DatabaseIter, DatabaseRo, DatabaseRw},
    error::{InitError, RuntimeError},
    table::Table,
    transaction::{TxRo, TxRw},
};

//---------------------------------------------------------------------------------------------------- Env
/// Database environment abstraction.
///
/// The functions that can be called on [`ConcreteEnv`](crate::ConcreteEnv).
///
/// # `Drop`
/// Implementations sync to disk in their drop implementation, so a cleanly
/// dropped environment never loses acknowledged commits regardless of the
/// configured [`SyncMode`](crate::config::SyncMode).
pub trait Env: Sized {
    //------------------------------------------------ Constants
    /// Does the backend forcefully sync to disk on every transaction
    /// commit?
    ///
    /// Used to skip redundant explicit [`Env::sync`] calls.
    const SYNCS_PER_TX: bool;

    //------------------------------------------------ Types
    /// The transaction/table factory borrowed out of the environment.
    type EnvInner<'env>: EnvInner<'env, Self::TxRo<'env>, Self::TxRw<'env>>
    where
        Self: 'env;

    /// Read-only transaction type.
    type TxRo<'tx>: TxRo<'tx>
    where
        Self: 'tx;

    /// Read/write transaction type.
    type TxRw<'tx>: TxRw<'tx>
    where
        Self: 'tx;

    //------------------------------------------------ Required
    /// Open (or create, per the config's flags) the environment.
    ///
    /// # Errors
    /// Fails on IO errors, on a held lock ([`InitError::AlreadyOpen`]), or
    /// on unreadable on-disk state.
    fn open(config: Config) -> Result<Self, InitError>;

    /// The [`Config`] this environment was opened with.
    fn config(&self) -> &Config;

    /// Durably flush all committed data to disk, regardless of sync mode.
    ///
    /// # Errors
    /// Fails on IO errors.
    fn sync(&self) -> Result<(), RuntimeError>;

    /// Borrow the transaction/table factory.
    fn env_inner(&self) -> Self::EnvInner<'_>;
}

//---------------------------------------------------------------------------------------------------- EnvInner
/// The transaction and table factory of an [`Env`].
///
/// Tables must be created (once, ever) with [`EnvInner::create_db`] before
/// [`EnvInner::open_db_ro`] can see them; opening a table that was never
/// created is [`RuntimeError::TableNotFound`], not a panic.
pub trait EnvInner<'env, Ro, Rw>
where
    Ro: TxRo<'env>,
    Rw: TxRw<'env>,
{
    /// Begin a read-only transaction.
    ///
    /// # Errors
    /// Fails on IO errors.
    fn tx_ro(&'env self) -> Result<Ro, RuntimeError>;

    /// Begin the write transaction.
    ///
    /// Blocks until any other writer has finished — there is only ever one.
    ///
    /// # Errors
    /// Fails on IO errors.
    fn tx_rw(&'env self) -> Result<Rw, RuntimeError>;

    /// Create the table `T` if it does not yet exist.
    ///
    /// # Errors
    /// Fails on IO errors.
    fn create_db<T: Table>(&self, tx_rw: &Rw) -> Result<(), RuntimeError>;

    /// Open table `T` for reading within `tx_ro`.
    ///
    /// # Errors
    /// [`RuntimeError::TableNotFound`] if the table was never created.
    fn open_db_ro<T: Table>(
        &self,
        tx_ro: &Ro,
    ) -> Result<impl DatabaseRo<T> + DatabaseIter<T>, RuntimeError>;

    /// Open table `T` for reading/writing within `tx_rw`.
    ///
    /// # Errors
    /// Fails on IO errors.
    fn open_db_rw<T: Table>(&self, tx_rw: &Rw) -> Result<impl DatabaseRw<T>, RuntimeError>;

    /// Delete every `(key, value)` pair in table `T`.
    ///
    /// # Errors
    /// Fails on IO errors.
    fn clear_db<T: Table>(&self, tx_rw: &mut Rw) -> Result<(), RuntimeError>;
}
