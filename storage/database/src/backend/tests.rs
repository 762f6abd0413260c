//! Tests for the concrete backend, through the trait surface only.

#![allow(clippy::unwrap_used)]

//---------------------------------------------------------------------------------------------------- Import
use pretty_assertions::assert_eq;

use crate::{
    config::Config,
    database::{DatabaseIter as _, DatabaseRo, DatabaseRw},
    env::{Env, EnvInner as _},
    error::RuntimeError,
    storable::StorableVec,
    table::Table,
    transaction::{TxRo as _, TxRw as _},
    ConcreteEnv,
};

//---------------------------------------------------------------------------------------------------- Test tables
struct Numbers;
impl Table for Numbers {
    const NAME: &'static str = "numbers";
    type Key = u64;
    type Value = u64;
}

struct Blobs;
impl Table for Blobs {
    const NAME: &'static str = "blobs";
    type Key = [u8; 32];
    type Value = StorableVec<u8>;
}

/// Open a fresh environment in a temporary directory with both test tables
/// created.
fn tmp_env() -> (ConcreteEnv, tempfile::TempDir) {
    let tempdir = tempfile::tempdir().unwrap();
    let env = ConcreteEnv::open(Config::new(tempdir.path().to_path_buf())).unwrap();
    {
        let env_inner = env.env_inner();
        let tx_rw = env_inner.tx_rw().unwrap();
        env_inner.create_db::<Numbers>(&tx_rw).unwrap();
        env_inner.create_db::<Blobs>(&tx_rw).unwrap();
        tx_rw.commit().unwrap();
    }
    (env, tempdir)
}

//---------------------------------------------------------------------------------------------------- Tests
#[test]
fn open_put_get_delete() {
    let (env, _tempdir) = tmp_env();
    let env_inner = env.env_inner();

    let tx_rw = env_inner.tx_rw().unwrap();
    {
        let mut table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
        table.put(&1, &100).unwrap();
        table.put(&2, &200).unwrap();
        assert_eq!(table.get(&1).unwrap(), 100);
        table.delete(&1).unwrap();
        assert!(matches!(
            table.get(&1),
            Err(RuntimeError::KeyNotFound)
        ));
    }
    tx_rw.commit().unwrap();

    let tx_ro = env_inner.tx_ro().unwrap();
    let table = env_inner.open_db_ro::<Numbers>(&tx_ro).unwrap();
    assert_eq!(table.get(&2).unwrap(), 200);
    assert_eq!(table.len().unwrap(), 1);
    assert!(table.contains(&2).unwrap());
    assert!(!table.contains(&1).unwrap());
    drop(table);
    tx_ro.commit().unwrap();
}

#[test]
fn dropped_write_transaction_aborts() {
    let (env, _tempdir) = tmp_env();
    let env_inner = env.env_inner();

    {
        let tx_rw = env_inner.tx_rw().unwrap();
        let mut table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
        table.put(&7, &700).unwrap();
        drop(table);
        // Dropped without commit: must not land.
    }

    let tx_ro = env_inner.tx_ro().unwrap();
    let table = env_inner.open_db_ro::<Numbers>(&tx_ro).unwrap();
    assert!(!table.contains(&7).unwrap());
}

#[test]
fn explicit_abort_discards_writes() {
    let (env, _tempdir) = tmp_env();
    let env_inner = env.env_inner();

    let tx_rw = env_inner.tx_rw().unwrap();
    {
        let mut table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
        table.put(&7, &700).unwrap();
    }
    tx_rw.abort().unwrap();

    let tx_ro = env_inner.tx_ro().unwrap();
    let table = env_inner.open_db_ro::<Numbers>(&tx_ro).unwrap();
    assert!(!table.contains(&7).unwrap());
}

#[test]
fn data_survives_reopen() {
    let tempdir = tempfile::tempdir().unwrap();
    let config = Config::new(tempdir.path().to_path_buf());

    {
        let env = ConcreteEnv::open(config.clone()).unwrap();
        let env_inner = env.env_inner();
        let tx_rw = env_inner.tx_rw().unwrap();
        env_inner.create_db::<Numbers>(&tx_rw).unwrap();
        {
            let mut table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
            table.put(&5, &500).unwrap();
        }
        tx_rw.commit().unwrap();
    }

    let env = ConcreteEnv::open(config).unwrap();
    let env_inner = env.env_inner();
    let tx_ro = env_inner.tx_ro().unwrap();
    let table = env_inner.open_db_ro::<Numbers>(&tx_ro).unwrap();
    assert_eq!(table.get(&5).unwrap(), 500);
}

#[test]
fn missing_table_is_table_not_found() {
    let tempdir = tempfile::tempdir().unwrap();
    let env = ConcreteEnv::open(Config::new(tempdir.path().to_path_buf())).unwrap();
    let env_inner = env.env_inner();

    // Commit *something* so a read transaction can exist.
    let tx_rw = env_inner.tx_rw().unwrap();
    env_inner.create_db::<Numbers>(&tx_rw).unwrap();
    tx_rw.commit().unwrap();

    let tx_ro = env_inner.tx_ro().unwrap();
    assert!(matches!(
        env_inner.open_db_ro::<Blobs>(&tx_ro).map(|_| ()),
        Err(RuntimeError::TableNotFound)
    ));
}

#[test]
fn iteration_is_in_key_order() {
    let (env, _tempdir) = tmp_env();
    let env_inner = env.env_inner();

    let tx_rw = env_inner.tx_rw().unwrap();
    {
        let mut table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
        // Inserted out of order; `u64` keys compare numerically.
        for key in [300u64, 2, 256, 1] {
            table.put(&key, &(key * 10)).unwrap();
        }
    }
    tx_rw.commit().unwrap();

    let tx_ro = env_inner.tx_ro().unwrap();
    let table = env_inner.open_db_ro::<Numbers>(&tx_ro).unwrap();

    let keys: Vec<u64> = table.keys().unwrap().map(Result::unwrap).collect();
    assert_eq!(keys, [1, 2, 256, 300]);

    let in_range: Vec<u64> = table
        .get_range(2..=256)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(in_range, [20, 2560]);

    assert_eq!(table.first().unwrap(), (1, 10));
    assert_eq!(table.last().unwrap(), (300, 3000));
}

#[test]
fn take_and_update() {
    let (env, _tempdir) = tmp_env();
    let env_inner = env.env_inner();

    let tx_rw = env_inner.tx_rw().unwrap();
    {
        let mut table = env_inner.open_db_rw::<Blobs>(&tx_rw).unwrap();
        let key = [9; 32];
        table.put(&key, &StorableVec(vec![1, 2, 3])).unwrap();

        table
            .update(&key, |mut blob| {
                blob.0.push(4);
                Some(blob)
            })
            .unwrap();
        assert_eq!(table.get(&key).unwrap().0, vec![1, 2, 3, 4]);

        assert_eq!(table.take(&key).unwrap().0, vec![1, 2, 3, 4]);
        assert!(matches!(table.take(&key), Err(RuntimeError::KeyNotFound)));
    }
    tx_rw.commit().unwrap();
}

#[test]
fn clear_db_empties_the_table() {
    let (env, _tempdir) = tmp_env();
    let env_inner = env.env_inner();

    let mut tx_rw = env_inner.tx_rw().unwrap();
    {
        let mut table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
        table.put(&1, &1).unwrap();
        table.put(&2, &2).unwrap();
    }
    env_inner.clear_db::<Numbers>(&mut tx_rw).unwrap();
    {
        let table = env_inner.open_db_rw::<Numbers>(&tx_rw).unwrap();
        assert!(table.is_empty().unwrap());
    }
    tx_rw.commit().unwrap();
}
