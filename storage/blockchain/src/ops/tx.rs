//! Transactions.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{DatabaseRo, DatabaseRw, RuntimeError, StorableVec};
use bramble_types::{Hash, Transaction, TxIn, TxOutTarget};

use crate::{
    error::StoreError,
    ops::{key_image, output},
    tables::{KeyImages, NumOutputs, Outputs, TxBlobs, TxInfos, TxOutputIndices},
    types::{OutputInfo, TxId, TxInfo},
};

//---------------------------------------------------------------------------------------------------- add
/// Add a transaction: mark its key images, store its body, and allocate
/// its outputs' per-amount indices.
///
/// `tx_hash` is the caller-supplied hash when it already has one (payload
/// transactions arrive alongside their hash in the block); for the miner
/// transaction it is `None` and recomputed here.
///
/// Returns the transaction's row id.
///
/// # Errors
/// - [`StoreError::KeyImageAlreadySpent`] on a double-spend
/// - [`StoreError::UnsupportedInput`] / [`StoreError::UnsupportedOutput`]
///   on script variants
///
/// Runs inside the block's write transaction; the caller aborts it on
/// error, which rolls back everything inserted here.
#[allow(clippy::too_many_arguments)] // one handle per touched table
pub fn add_transaction(
    tx_infos: &mut impl DatabaseRw<TxInfos>,
    tx_blobs: &mut impl DatabaseRw<TxBlobs>,
    tx_output_indices: &mut impl DatabaseRw<TxOutputIndices>,
    outputs: &mut impl DatabaseRw<Outputs>,
    num_outputs: &mut impl DatabaseRw<NumOutputs>,
    key_images: &mut impl DatabaseRw<KeyImages>,
    block_hash: &Hash,
    tx: &Transaction,
    tx_hash: Option<Hash>,
) -> Result<TxId, StoreError> {
    // Hash only recomputed for miner transactions.
    let tx_hash = tx_hash.unwrap_or_else(|| tx.hash());

    for input in &tx.prefix.vin {
        match input {
            TxIn::ToKey { key_image, .. } => key_image::add_key_image(key_images, key_image)?,
            TxIn::Gen { .. } => (),
            TxIn::ToScript { .. } | TxIn::ToScriptHash { .. } => {
                return Err(StoreError::UnsupportedInput);
            }
        }
    }

    // Row ids are dense: transactions only ever leave from the top (pop),
    // so the current row count is the next free id.
    let tx_id: TxId = tx_blobs.len()?;

    tx_infos.put(
        tx_hash.as_bytes(),
        &TxInfo {
            tx_id,
            unlock_time: tx.prefix.unlock_time,
            block_hash: *block_hash.as_bytes(),
        },
    )?;
    tx_blobs.put(&tx_id, &StorableVec(tx.to_bytes()))?;

    let mut amount_indices = Vec::with_capacity(tx.prefix.vout.len());
    for (local_index, out) in tx.prefix.vout.iter().enumerate() {
        let TxOutTarget::ToKey { .. } = out.target else {
            return Err(StoreError::UnsupportedOutput);
        };
        let amount_index = output::add_output(
            outputs,
            num_outputs,
            out.amount,
            &OutputInfo {
                tx_hash: *tx_hash.as_bytes(),
                local_index: local_index as u64,
                unlock_time: tx.prefix.unlock_time,
            },
        )?;
        amount_indices.push(amount_index);
    }
    tx_output_indices.put(&tx_id, &StorableVec(amount_indices))?;

    Ok(tx_id)
}

//---------------------------------------------------------------------------------------------------- remove
/// Remove a transaction by hash: unmark its key images and free its
/// outputs' indices, in reverse insertion order.
///
/// Returns the decoded transaction.
///
/// # Errors
/// [`StoreError::TxNotFound`] if unknown; [`StoreError::MalformedBlob`] if
/// the stored blob no longer decodes (store corruption).
#[allow(clippy::too_many_arguments)] // one handle per touched table
pub fn remove_transaction(
    tx_infos: &mut impl DatabaseRw<TxInfos>,
    tx_blobs: &mut impl DatabaseRw<TxBlobs>,
    tx_output_indices: &mut impl DatabaseRw<TxOutputIndices>,
    outputs: &mut impl DatabaseRw<Outputs>,
    num_outputs: &mut impl DatabaseRw<NumOutputs>,
    key_images: &mut impl DatabaseRw<KeyImages>,
    tx_hash: &Hash,
) -> Result<Transaction, StoreError> {
    let info = match tx_infos.take(tx_hash.as_bytes()) {
        Ok(info) => info,
        Err(RuntimeError::KeyNotFound) => return Err(StoreError::TxNotFound),
        Err(e) => return Err(e.into()),
    };

    let blob = tx_blobs.take(&info.tx_id)?;
    let tx = Transaction::from_bytes(&blob)?;

    for input in &tx.prefix.vin {
        if let TxIn::ToKey { key_image, .. } = input {
            key_image::remove_key_image(key_images, key_image)?;
        }
    }

    // The removed index must be the maximum of its amount; outputs were
    // appended in output order, so freeing in reverse keeps that true.
    for out in tx.prefix.vout.iter().rev() {
        output::remove_output(outputs, num_outputs, out.amount)?;
    }
    tx_output_indices.delete(&info.tx_id)?;

    Ok(tx)
}

//---------------------------------------------------------------------------------------------------- get
/// Fetch and decode a transaction by hash.
///
/// # Errors
/// [`StoreError::TxNotFound`] if unknown; [`StoreError::MalformedBlob`] if
/// the stored blob no longer decodes.
pub fn get_transaction(
    tx_infos: &impl DatabaseRo<TxInfos>,
    tx_blobs: &impl DatabaseRo<TxBlobs>,
    tx_hash: &Hash,
) -> Result<Transaction, StoreError> {
    let info = get_tx_info(tx_infos, tx_hash)?;
    let blob = tx_blobs.get(&info.tx_id)?;
    Ok(Transaction::from_bytes(&blob)?)
}

/// Fetch a transaction's metadata by hash.
///
/// # Errors
/// [`StoreError::TxNotFound`] if unknown.
pub fn get_tx_info(
    tx_infos: &impl DatabaseRo<TxInfos>,
    tx_hash: &Hash,
) -> Result<TxInfo, StoreError> {
    match tx_infos.get(tx_hash.as_bytes()) {
        Ok(info) => Ok(info),
        Err(RuntimeError::KeyNotFound) => Err(StoreError::TxNotFound),
        Err(e) => Err(e.into()),
    }
}
