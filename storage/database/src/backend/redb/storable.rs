//! `bramble_database::Storable` <-> `redb` serde trait compatibility layer.

//---------------------------------------------------------------------------------------------------- Import
use std::{cmp::Ordering, fmt::Debug, marker::PhantomData};

use redb::TypeName;

use crate::{key::Key, storable::Storable};

//---------------------------------------------------------------------------------------------------- StorableRedb
/// The glue struct that implements `redb`'s (de)serialization traits on any
/// type implementing [`Storable`] (and [`Key`], for keys).
///
/// Never constructed — used purely for trait bound translation.
#[derive(Debug)]
pub(super) struct StorableRedb<T>(PhantomData<T>);

//---------------------------------------------------------------------------------------------------- redb::Value
impl<T> redb::Value for StorableRedb<T>
where
    T: Storable + 'static,
{
    type SelfType<'a> = T;
    type AsBytes<'a> = &'a [u8];

    #[inline]
    fn fixed_width() -> Option<usize> {
        T::BYTE_LENGTH
    }

    #[inline]
    fn from_bytes<'a>(data: &'a [u8]) -> T
    where
        Self: 'a,
    {
        T::from_bytes(data)
    }

    #[inline]
    fn as_bytes<'a, 'b: 'a>(value: &'a T) -> &'a [u8]
    where
        Self: 'a + 'b,
    {
        value.as_bytes()
    }

    #[inline]
    fn type_name() -> TypeName {
        TypeName::new(std::any::type_name::<T>())
    }
}

//---------------------------------------------------------------------------------------------------- redb::Key
// If `Key` is also implemented, this can act as a `redb::Key`,
// carrying the key type's ordering into the backend.
impl<T> redb::Key for StorableRedb<T>
where
    T: Key + 'static,
{
    #[inline]
    fn compare(left: &[u8], right: &[u8]) -> Ordering {
        T::KEY_COMPARE.compare(left, right)
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storable::StorableVec;

    #[test]
    fn fixed_width_matches_storable() {
        assert_eq!(<StorableRedb<u64> as redb::Value>::fixed_width(), Some(8));
        assert_eq!(<StorableRedb<[u8; 32]> as redb::Value>::fixed_width(), Some(32));
        assert_eq!(<StorableRedb<StorableVec<u8>> as redb::Value>::fixed_width(), None);
    }

    #[test]
    fn key_comparison_is_numeric_for_integers() {
        assert_eq!(
            <StorableRedb<u64> as redb::Key>::compare(
                &256u64.to_le_bytes(),
                &255u64.to_le_bytes(),
            ),
            Ordering::Greater,
        );
    }

    #[test]
    fn value_roundtrip() {
        let vec = StorableVec::<u8>(vec![1, 2, 3]);
        let bytes = <StorableRedb<StorableVec<u8>> as redb::Value>::as_bytes(&vec);
        assert_eq!(bytes, &[1, 2, 3]);
        assert_eq!(
            <StorableRedb<StorableVec<u8>> as redb::Value>::from_bytes(&[1, 2, 3]),
            vec,
        );
    }
}
