//! Spent key images.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{DatabaseRo, DatabaseRw, RuntimeError};
use bramble_types::KeyImage;

use crate::{error::StoreError, tables::KeyImages};

//---------------------------------------------------------------------------------------------------- Free functions
/// Mark a key image as spent.
///
/// # Errors
/// [`StoreError::KeyImageAlreadySpent`] if the image is already present —
/// the double-spend invariant. The caller aborts the surrounding write
/// transaction, which also rolls back any images inserted earlier for the
/// same block.
pub fn add_key_image(
    key_images: &mut impl DatabaseRw<KeyImages>,
    key_image: &KeyImage,
) -> Result<(), StoreError> {
    if key_images.contains(key_image.as_bytes())? {
        return Err(StoreError::KeyImageAlreadySpent(*key_image));
    }
    key_images.put(key_image.as_bytes(), &())?;
    Ok(())
}

/// Unmark a key image while its spending transaction is being removed.
///
/// # Errors
/// [`RuntimeError::KeyNotFound`] if the image was not marked — popping a
/// transaction whose images are absent means the indices are inconsistent.
pub fn remove_key_image(
    key_images: &mut impl DatabaseRw<KeyImages>,
    key_image: &KeyImage,
) -> Result<(), RuntimeError> {
    key_images.take(key_image.as_bytes())
}

/// Is this key image marked spent?
///
/// # Errors
/// Database errors.
pub fn key_image_exists(
    key_images: &impl DatabaseRo<KeyImages>,
    key_image: &KeyImage,
) -> Result<bool, RuntimeError> {
    key_images.contains(key_image.as_bytes())
}
