//! (De)serialization for table keys & values; `trait Storable`.

//---------------------------------------------------------------------------------------------------- Import
use std::fmt::Debug;

use bytemuck::Pod;

//---------------------------------------------------------------------------------------------------- Storable
/// A type that can be stored in the database.
///
/// All keys and values must round-trip through raw bytes. The conversions
/// must be infallible and panic-free: values only ever come from
/// [`Storable::as_bytes`] of the same type, and unaligned input is handled
/// by copying.
///
/// Blanket-implemented for every [`bytemuck::Pod`] type; variable-width
/// data goes through [`StorableVec`] or [`StorableString`].
pub trait Storable: Debug {
    /// The fixed byte width of this type, or `None` when variable.
    const BYTE_LENGTH: Option<usize>;

    /// View `self` as raw bytes.
    fn as_bytes(&self) -> &[u8];

    /// Rebuild an owned `Self` from (potentially unaligned) bytes.
    fn from_bytes(bytes: &[u8]) -> Self;
}

//---------------------------------------------------------------------------------------------------- Impl
impl<T: Pod + Debug> Storable for T {
    const BYTE_LENGTH: Option<usize> = Some(std::mem::size_of::<T>());

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    #[inline]
    fn from_bytes(bytes: &[u8]) -> T {
        bytemuck::pod_read_unaligned(bytes)
    }
}

//---------------------------------------------------------------------------------------------------- StorableVec
/// A [`Storable`] wrapper for `Vec<T>`.
///
/// `#[repr(transparent)]` so that a `&Vec<T>` can be wrapped for free with
/// [`StorableVec::wrap_ref`].
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, bytemuck::TransparentWrapper)]
#[repr(transparent)]
pub struct StorableVec<T>(pub Vec<T>);

impl<T> StorableVec<T> {
    /// View a plain `Vec` as a `StorableVec` without copying.
    #[allow(clippy::ptr_arg)] // `TransparentWrapper`'s `Inner` is the `Vec` itself
    pub fn wrap_ref(vec: &Vec<T>) -> &Self {
        bytemuck::TransparentWrapper::wrap_ref(vec)
    }
}

impl<T: Pod + Debug> Storable for StorableVec<T> {
    const BYTE_LENGTH: Option<usize> = None;

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        bytemuck::must_cast_slice(&self.0)
    }

    #[inline]
    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytemuck::pod_collect_to_vec(bytes))
    }
}

impl<T> std::ops::Deref for StorableVec<T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for StorableVec<T> {
    fn from(vec: Vec<T>) -> Self {
        Self(vec)
    }
}

//---------------------------------------------------------------------------------------------------- StorableString
/// A [`Storable`] wrapper for `String`, stored as its UTF-8 bytes.
///
/// Decoding is lossy on principle — values written through this type are
/// always valid UTF-8, so the lossy path never actually triggers.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorableString(pub String);

impl Storable for StorableString {
    const BYTE_LENGTH: Option<usize> = None;

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[inline]
    fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl From<String> for StorableString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StorableString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
