//! Abstracted database table operations; `trait DatabaseRo` & `trait DatabaseRw`.

//---------------------------------------------------------------------------------------------------- Import
use std::ops::RangeBounds;

use crate::{error::RuntimeError, table::Table};

//---------------------------------------------------------------------------------------------------- DatabaseIter
/// Read-only iteration over a table.
///
/// Only read-only table handles implement this: write handles cannot
/// soundly hand out iterators tied to a transaction that is still being
/// mutated.
pub trait DatabaseIter<T: Table> {
    /// Iterate over the values whose keys fall in `range`, in key order.
    ///
    /// # Errors
    /// The call and each yielded item can fail with IO errors.
    #[allow(clippy::iter_not_returning_iterator)]
    fn get_range<'a, Range>(
        &'a self,
        range: Range,
    ) -> Result<impl Iterator<Item = Result<T::Value, RuntimeError>> + 'a, RuntimeError>
    where
        Range: RangeBounds<T::Key> + 'a;

    /// Iterate over every `(key, value)` pair, in key order.
    ///
    /// # Errors
    /// The call and each yielded item can fail with IO errors.
    #[allow(clippy::iter_not_returning_iterator)]
    fn iter(
        &self,
    ) -> Result<impl Iterator<Item = Result<(T::Key, T::Value), RuntimeError>> + '_, RuntimeError>;

    /// Iterate over every key, in order.
    ///
    /// # Errors
    /// The call and each yielded item can fail with IO errors.
    fn keys(&self)
        -> Result<impl Iterator<Item = Result<T::Key, RuntimeError>> + '_, RuntimeError>;

    /// Iterate over every value, in key order.
    ///
    /// # Errors
    /// The call and each yielded item can fail with IO errors.
    fn values(
        &self,
    ) -> Result<impl Iterator<Item = Result<T::Value, RuntimeError>> + '_, RuntimeError>;
}

//---------------------------------------------------------------------------------------------------- DatabaseRo
/// Read operations on one table.
pub trait DatabaseRo<T: Table> {
    /// Get the value corresponding to a key.
    ///
    /// # Errors
    /// [`RuntimeError::KeyNotFound`] if `key` does not exist, or IO errors.
    fn get(&self, key: &T::Key) -> Result<T::Value, RuntimeError>;

    /// Returns `true` if the table contains `key`.
    ///
    /// # Errors
    /// Never [`RuntimeError::KeyNotFound`]; that maps to `Ok(false)`.
    fn contains(&self, key: &T::Key) -> Result<bool, RuntimeError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(RuntimeError::KeyNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns the number of `(key, value)` pairs in the table.
    ///
    /// # Errors
    /// IO errors.
    fn len(&self) -> Result<u64, RuntimeError>;

    /// Returns `true` if the table holds no pairs.
    ///
    /// # Errors
    /// IO errors.
    fn is_empty(&self) -> Result<bool, RuntimeError> {
        Ok(self.len()? == 0)
    }

    /// Returns the first `(key, value)` pair in key order.
    ///
    /// # Errors
    /// [`RuntimeError::KeyNotFound`] on an empty table, or IO errors.
    fn first(&self) -> Result<(T::Key, T::Value), RuntimeError>;

    /// Returns the last `(key, value)` pair in key order.
    ///
    /// # Errors
    /// [`RuntimeError::KeyNotFound`] on an empty table, or IO errors.
    fn last(&self) -> Result<(T::Key, T::Value), RuntimeError>;
}

//---------------------------------------------------------------------------------------------------- DatabaseRw
/// Read/write operations on one table.
pub trait DatabaseRw<T: Table>: DatabaseRo<T> {
    /// Insert a key-value pair, overwriting any existing value.
    ///
    /// # Errors
    /// IO errors; never [`RuntimeError::KeyExists`].
    fn put(&mut self, key: &T::Key, value: &T::Value) -> Result<(), RuntimeError>;

    /// Delete a key-value pair. Deleting a missing key is `Ok(())`.
    ///
    /// # Errors
    /// IO errors.
    fn delete(&mut self, key: &T::Key) -> Result<(), RuntimeError>;

    /// Delete and return a key-value pair.
    ///
    /// # Errors
    /// [`RuntimeError::KeyNotFound`] if `key` does not exist, or IO errors.
    fn take(&mut self, key: &T::Key) -> Result<T::Value, RuntimeError>;

    /// Fetch a value and replace it with `f`'s output, or delete the entry
    /// when `f` returns `None`.
    ///
    /// # Errors
    /// [`RuntimeError::KeyNotFound`] if `key` does not exist, or IO errors.
    fn update<F>(&mut self, key: &T::Key, mut f: F) -> Result<(), RuntimeError>
    where
        F: FnMut(T::Value) -> Option<T::Value>,
    {
        let value = DatabaseRo::get(self, key)?;
        match f(value) {
            Some(value) => DatabaseRw::put(self, key, &value),
            None => DatabaseRw::delete(self, key),
        }
    }
}
