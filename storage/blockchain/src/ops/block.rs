//! Blocks.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{DatabaseRo, DatabaseRw, RuntimeError, StorableVec};
use bramble_types::{Block, Hash};

use crate::{
    error::StoreError,
    ops::property,
    tables::{BlockBlobs, BlockHeights, BlockInfos, Metadata},
    types::{BlockHeight, BlockInfo},
};

//---------------------------------------------------------------------------------------------------- add/remove
/// Store a block's body and metadata at `height` and advance the chain.
///
/// `height` must equal the current `metadata.height` — the monotone-height
/// invariant lives here, not in the caller.
///
/// # Errors
/// Fails when `height` is not the next height — the reserved slot does
/// not match the chain tip.
#[allow(clippy::too_many_arguments)] // one handle per touched table
pub fn add_block_data(
    block_blobs: &mut impl DatabaseRw<BlockBlobs>,
    block_infos: &mut impl DatabaseRw<BlockInfos>,
    block_heights: &mut impl DatabaseRw<BlockHeights>,
    metadata: &mut impl DatabaseRw<Metadata>,
    height: BlockHeight,
    block: &Block,
    info: &BlockInfo,
) -> Result<(), StoreError> {
    if property::chain_height(metadata)? != height {
        return Err(RuntimeError::Storage(format!(
            "block insert at height {height} does not match the chain tip"
        ))
        .into());
    }

    block_blobs.put(&height, &StorableVec(block.to_bytes()))?;
    block_infos.put(&height, info)?;
    block_heights.put(&info.block_hash, &height)?;

    property::set_pod(metadata, property::HEIGHT, &(height + 1))?;
    property::set_pod(metadata, property::TOP_BLOCK_HASH, &info.block_hash)?;
    property::set_pod(
        metadata,
        property::CUMULATIVE_DIFFICULTY,
        &info.cumulative_difficulty(),
    )?;
    property::set_pod(metadata, property::COINS_GENERATED, &info.coins_generated)?;
    property::set_pod(metadata, property::COINS_DONATED, &info.coins_donated)?;
    Ok(())
}

/// Remove the top block's body and metadata and rewind the chain-level
/// slots to the new top (or to zero on an emptied chain).
///
/// Returns the removed block's decoded body and its [`BlockInfo`].
///
/// # Errors
/// [`StoreError::EmptyChain`] at height 0; [`StoreError::MalformedBlob`]
/// if a stored blob no longer decodes.
pub fn remove_top_block_data(
    block_blobs: &mut impl DatabaseRw<BlockBlobs>,
    block_infos: &mut impl DatabaseRw<BlockInfos>,
    block_heights: &mut impl DatabaseRw<BlockHeights>,
    metadata: &mut impl DatabaseRw<Metadata>,
) -> Result<(Block, BlockInfo), StoreError> {
    let height = property::chain_height(metadata)?;
    let Some(top_height) = height.checked_sub(1) else {
        return Err(StoreError::EmptyChain);
    };

    let blob = block_blobs.take(&top_height)?;
    let block = Block::from_bytes(&blob)?;
    let info = block_infos.take(&top_height)?;
    block_heights.delete(&info.block_hash)?;

    // Rewind the chain-level slots to the new top block.
    let (top_hash, difficulty, generated, donated) = if top_height == 0 {
        ([0u8; 32], 0u128, 0u64, 0u64)
    } else {
        let parent = block_infos.get(&(top_height - 1))?;
        (
            parent.block_hash,
            parent.cumulative_difficulty(),
            parent.coins_generated,
            parent.coins_donated,
        )
    };
    property::set_pod(metadata, property::HEIGHT, &top_height)?;
    property::set_pod(metadata, property::TOP_BLOCK_HASH, &top_hash)?;
    property::set_pod(metadata, property::CUMULATIVE_DIFFICULTY, &difficulty)?;
    property::set_pod(metadata, property::COINS_GENERATED, &generated)?;
    property::set_pod(metadata, property::COINS_DONATED, &donated)?;

    Ok((block, info))
}

//---------------------------------------------------------------------------------------------------- get
/// Fetch and decode the block at `height`.
///
/// # Errors
/// [`StoreError::BlockNotFound`] if `height` is not stored;
/// [`StoreError::MalformedBlob`] if the stored blob no longer decodes.
pub fn get_block_by_height(
    block_blobs: &impl DatabaseRo<BlockBlobs>,
    height: BlockHeight,
) -> Result<Block, StoreError> {
    let blob = match block_blobs.get(&height) {
        Ok(blob) => blob,
        Err(RuntimeError::KeyNotFound) => return Err(StoreError::BlockNotFound),
        Err(e) => return Err(e.into()),
    };
    Ok(Block::from_bytes(&blob)?)
}

/// Fetch the metadata of the block at `height`.
///
/// # Errors
/// [`StoreError::BlockNotFound`] if `height` is not stored.
pub fn get_block_info(
    block_infos: &impl DatabaseRo<BlockInfos>,
    height: BlockHeight,
) -> Result<BlockInfo, StoreError> {
    match block_infos.get(&height) {
        Ok(info) => Ok(info),
        Err(RuntimeError::KeyNotFound) => Err(StoreError::BlockNotFound),
        Err(e) => Err(e.into()),
    }
}

/// Resolve a block hash to its height.
///
/// # Errors
/// [`StoreError::BlockNotFound`] if the hash is unknown.
pub fn block_height_by_hash(
    block_heights: &impl DatabaseRo<BlockHeights>,
    hash: &Hash,
) -> Result<BlockHeight, StoreError> {
    match block_heights.get(hash.as_bytes()) {
        Ok(height) => Ok(height),
        Err(RuntimeError::KeyNotFound) => Err(StoreError::BlockNotFound),
        Err(e) => Err(e.into()),
    }
}
