//! Implementation of `trait DatabaseR{o,w}` for `redb`.

//---------------------------------------------------------------------------------------------------- Import
use std::ops::RangeBounds;

// `len()` and friends come through `ReadableTable`'s
// `ReadableTableMetadata` supertrait.
use redb::ReadableTable;

use crate::{
    backend::redb::{
        storable::StorableRedb,
        types::{RedbTableRo, RedbTableRw},
    },
    database::{DatabaseIter, DatabaseRo, DatabaseRw},
    error::RuntimeError,
    table::Table,
};

//---------------------------------------------------------------------------------------------------- Shared functions
// Implemented over any `redb` readable table once, used by both the
// read-only and read/write handle impls below.

#[inline]
fn get<T: Table>(
    db: &impl ReadableTable<StorableRedb<T::Key>, StorableRedb<T::Value>>,
    key: &T::Key,
) -> Result<T::Value, RuntimeError> {
    Ok(db.get(key)?.ok_or(RuntimeError::KeyNotFound)?.value())
}

#[inline]
fn len<T: Table>(
    db: &impl ReadableTable<StorableRedb<T::Key>, StorableRedb<T::Value>>,
) -> Result<u64, RuntimeError> {
    Ok(db.len()?)
}

#[inline]
fn first<T: Table>(
    db: &impl ReadableTable<StorableRedb<T::Key>, StorableRedb<T::Value>>,
) -> Result<(T::Key, T::Value), RuntimeError> {
    let (key, value) = db.first()?.ok_or(RuntimeError::KeyNotFound)?;
    Ok((key.value(), value.value()))
}

#[inline]
fn last<T: Table>(
    db: &impl ReadableTable<StorableRedb<T::Key>, StorableRedb<T::Value>>,
) -> Result<(T::Key, T::Value), RuntimeError> {
    let (key, value) = db.last()?.ok_or(RuntimeError::KeyNotFound)?;
    Ok((key.value(), value.value()))
}

//---------------------------------------------------------------------------------------------------- DatabaseIter
impl<T: Table + 'static> DatabaseIter<T> for RedbTableRo<T::Key, T::Value> {
    fn get_range<'a, Range>(
        &'a self,
        range: Range,
    ) -> Result<impl Iterator<Item = Result<T::Value, RuntimeError>> + 'a, RuntimeError>
    where
        Range: RangeBounds<T::Key> + 'a,
    {
        Ok(ReadableTable::range(self, range)?.map(|result| match result {
            Ok((_key, value)) => Ok(value.value()),
            Err(e) => Err(RuntimeError::from(e)),
        }))
    }

    fn iter(
        &self,
    ) -> Result<impl Iterator<Item = Result<(T::Key, T::Value), RuntimeError>> + '_, RuntimeError>
    {
        Ok(ReadableTable::iter(self)?.map(|result| match result {
            Ok((key, value)) => Ok((key.value(), value.value())),
            Err(e) => Err(RuntimeError::from(e)),
        }))
    }

    fn keys(
        &self,
    ) -> Result<impl Iterator<Item = Result<T::Key, RuntimeError>> + '_, RuntimeError> {
        Ok(ReadableTable::iter(self)?.map(|result| match result {
            Ok((key, _value)) => Ok(key.value()),
            Err(e) => Err(RuntimeError::from(e)),
        }))
    }

    fn values(
        &self,
    ) -> Result<impl Iterator<Item = Result<T::Value, RuntimeError>> + '_, RuntimeError> {
        Ok(ReadableTable::iter(self)?.map(|result| match result {
            Ok((_key, value)) => Ok(value.value()),
            Err(e) => Err(RuntimeError::from(e)),
        }))
    }
}

//---------------------------------------------------------------------------------------------------- DatabaseRo
impl<T: Table + 'static> DatabaseRo<T> for RedbTableRo<T::Key, T::Value> {
    #[inline]
    fn get(&self, key: &T::Key) -> Result<T::Value, RuntimeError> {
        get::<T>(self, key)
    }

    #[inline]
    fn len(&self) -> Result<u64, RuntimeError> {
        len::<T>(self)
    }

    #[inline]
    fn first(&self) -> Result<(T::Key, T::Value), RuntimeError> {
        first::<T>(self)
    }

    #[inline]
    fn last(&self) -> Result<(T::Key, T::Value), RuntimeError> {
        last::<T>(self)
    }
}

impl<T: Table + 'static> DatabaseRo<T> for RedbTableRw<'_, T::Key, T::Value> {
    #[inline]
    fn get(&self, key: &T::Key) -> Result<T::Value, RuntimeError> {
        get::<T>(self, key)
    }

    #[inline]
    fn len(&self) -> Result<u64, RuntimeError> {
        len::<T>(self)
    }

    #[inline]
    fn first(&self) -> Result<(T::Key, T::Value), RuntimeError> {
        first::<T>(self)
    }

    #[inline]
    fn last(&self) -> Result<(T::Key, T::Value), RuntimeError> {
        last::<T>(self)
    }
}

//---------------------------------------------------------------------------------------------------- DatabaseRw
impl<T: Table + 'static> DatabaseRw<T> for RedbTableRw<'_, T::Key, T::Value> {
    #[inline]
    fn put(&mut self, key: &T::Key, value: &T::Value) -> Result<(), RuntimeError> {
        self.insert(key, value)?;
        Ok(())
    }

    #[inline]
    fn delete(&mut self, key: &T::Key) -> Result<(), RuntimeError> {
        self.remove(key)?;
        Ok(())
    }

    #[inline]
    fn take(&mut self, key: &T::Key) -> Result<T::Value, RuntimeError> {
        Ok(self.remove(key)?.ok_or(RuntimeError::KeyNotFound)?.value())
    }
}
