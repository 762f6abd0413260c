//! Implementation of `trait Env` for `redb`.

//---------------------------------------------------------------------------------------------------- Import
use crate::{
    backend::redb::{
        storable::StorableRedb,
        types::{RedbTableRo, RedbTableRw},
    },
    config::{Config, OpenFlags, SyncMode},
    database::{DatabaseIter, DatabaseRo, DatabaseRw},
    env::{Env, EnvInner},
    error::{InitError, RuntimeError},
    table::Table,
    transaction::TxRw,
};

//---------------------------------------------------------------------------------------------------- ConcreteEnv
/// A strongly typed, concrete database environment, backed by `redb`.
pub struct ConcreteEnv {
    /// The actual database environment.
    env: redb::Database,

    /// The configuration we were opened with (and in current use).
    config: Config,

    /// A cached `redb` version of [`Config::sync_mode`].
    /// `redb` sets durability _per_ transaction, so this value is
    /// re-applied on every [`EnvInner::tx_rw`].
    durability: redb::Durability,
}

impl std::fmt::Debug for ConcreteEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcreteEnv")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for ConcreteEnv {
    fn drop(&mut self) {
        // Dropping the env must leave acknowledged commits durable even
        // under the weaker sync modes.
        let _ = self.sync();
    }
}

//---------------------------------------------------------------------------------------------------- Env Impl
impl Env for ConcreteEnv {
    const SYNCS_PER_TX: bool = false;
    type EnvInner<'env> = (&'env redb::Database, redb::Durability);
    type TxRo<'tx> = redb::ReadTransaction;
    type TxRw<'tx> = redb::WriteTransaction;

    #[cold]
    #[inline(never)] // called once per database.
    fn open(config: Config) -> Result<Self, InitError> {
        let durability = match config.sync_mode {
            SyncMode::Safe => redb::Durability::Immediate,
            SyncMode::Fast => redb::Durability::Eventual,
            SyncMode::Fastest => redb::Durability::None,
        };

        let create = config.flags.contains(OpenFlags::CREATE_IF_MISSING);
        if create {
            std::fs::create_dir_all(config.db_directory())?;
        }

        let db_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .open(config.db_file())?;

        let env = redb::Builder::new().create_file(db_file)?;

        Ok(Self {
            env,
            config,
            durability,
        })
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn sync(&self) -> Result<(), RuntimeError> {
        // `redb`'s syncs are tied to write transactions: create an empty
        // one with full durability and commit it.
        let mut tx_rw = self.env.begin_write()?;
        tx_rw.set_durability(redb::Durability::Immediate);
        TxRw::commit(tx_rw)
    }

    fn env_inner(&self) -> Self::EnvInner<'_> {
        (&self.env, self.durability)
    }
}

//---------------------------------------------------------------------------------------------------- EnvInner Impl
impl<'env> EnvInner<'env, redb::ReadTransaction, redb::WriteTransaction>
    for (&'env redb::Database, redb::Durability)
{
    #[inline]
    fn tx_ro(&'env self) -> Result<redb::ReadTransaction, RuntimeError> {
        Ok(self.0.begin_read()?)
    }

    #[inline]
    fn tx_rw(&'env self) -> Result<redb::WriteTransaction, RuntimeError> {
        // `redb` has sync modes on the transaction level, so durability is
        // applied on every write transaction handed out.
        let mut tx_rw = self.0.begin_write()?;
        tx_rw.set_durability(self.1);
        Ok(tx_rw)
    }

    #[inline]
    fn create_db<T: Table>(&self, tx_rw: &redb::WriteTransaction) -> Result<(), RuntimeError> {
        // `redb` creates tables if they don't exist.
        tx_rw.open_table(table_definition::<T>())?;
        Ok(())
    }

    #[inline]
    fn open_db_ro<T: Table>(
        &self,
        tx_ro: &redb::ReadTransaction,
    ) -> Result<impl DatabaseRo<T> + DatabaseIter<T>, RuntimeError> {
        // INVARIANT: the store creates all its tables on open, so this maps
        // a missing table to `TableNotFound` instead of panicking.
        let table: RedbTableRo<T::Key, T::Value> = tx_ro.open_table(table_definition::<T>())?;
        Ok(table)
    }

    #[inline]
    fn open_db_rw<T: Table>(
        &self,
        tx_rw: &redb::WriteTransaction,
    ) -> Result<impl DatabaseRw<T>, RuntimeError> {
        // `redb` creates tables if they don't exist.
        let table: RedbTableRw<'_, T::Key, T::Value> = tx_rw.open_table(table_definition::<T>())?;
        Ok(table)
    }

    fn clear_db<T: Table>(&self, tx_rw: &mut redb::WriteTransaction) -> Result<(), RuntimeError> {
        tx_rw.delete_table(table_definition::<T>())?;
        tx_rw.open_table(table_definition::<T>())?;
        Ok(())
    }
}

/// The `redb` table definition for `T`, derived from its compile-time
/// metadata.
fn table_definition<T: Table>(
) -> redb::TableDefinition<'static, StorableRedb<T::Key>, StorableRedb<T::Value>> {
    redb::TableDefinition::new(T::NAME)
}
