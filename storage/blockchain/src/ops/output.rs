//! The per-amount output index.
//!
//! Every indexed output of amount `a` gets the next dense index
//! `0, 1, 2, …` within `a`. [`NumOutputs`] is the allocator: it holds the
//! count per amount, so the next index never needs a range scan.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{DatabaseRo, DatabaseRw, RuntimeError};

use crate::{
    tables::{NumOutputs, Outputs},
    types::{Amount, AmountIndex, OutputId, OutputInfo},
};

//---------------------------------------------------------------------------------------------------- Free functions
/// Number of outputs recorded for `amount`.
///
/// # Errors
/// Database errors.
pub fn num_outputs(
    num_outputs: &impl DatabaseRo<NumOutputs>,
    amount: Amount,
) -> Result<u64, RuntimeError> {
    match num_outputs.get(&amount) {
        Ok(count) => Ok(count),
        Err(RuntimeError::KeyNotFound) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Record a new output of `amount`, allocating the next dense index.
///
/// Returns the allocated index.
///
/// # Errors
/// Database errors.
pub fn add_output(
    outputs: &mut impl DatabaseRw<Outputs>,
    counts: &mut impl DatabaseRw<NumOutputs>,
    amount: Amount,
    info: &OutputInfo,
) -> Result<AmountIndex, RuntimeError> {
    let amount_index = num_outputs(counts, amount)?;
    outputs.put(
        &OutputId {
            amount,
            amount_index,
        },
        info,
    )?;
    counts.put(&amount, &(amount_index + 1))?;
    Ok(amount_index)
}

/// Remove the *maximum* index of `amount` — never an arbitrary one, so the
/// per-amount range stays dense from 0.
///
/// # Errors
/// [`RuntimeError::KeyNotFound`] if `amount` has no outputs recorded.
pub fn remove_output(
    outputs: &mut impl DatabaseRw<Outputs>,
    counts: &mut impl DatabaseRw<NumOutputs>,
    amount: Amount,
) -> Result<OutputInfo, RuntimeError> {
    let count = num_outputs(counts, amount)?;
    let Some(top_index) = count.checked_sub(1) else {
        return Err(RuntimeError::KeyNotFound);
    };

    let info = outputs.take(&OutputId {
        amount,
        amount_index: top_index,
    })?;

    if top_index == 0 {
        counts.delete(&amount)?;
    } else {
        counts.put(&amount, &top_index)?;
    }
    Ok(info)
}

/// Look up the output at `(amount, index)`.
///
/// # Errors
/// [`RuntimeError::KeyNotFound`] if the index is not populated.
pub fn get_output(
    outputs: &impl DatabaseRo<Outputs>,
    amount: Amount,
    amount_index: AmountIndex,
) -> Result<OutputInfo, RuntimeError> {
    outputs.get(&OutputId {
        amount,
        amount_index,
    })
}
