use std::collections::HashMap;

use anyhow::Result;
use arithmetic::U64Ext as _;
use helper_functions::{
    error::Error as HelperError, misc::compute_activation_exit_epoch, mutators::decrease_balance,
};
use tracing::debug;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    traits::BeaconState,
};

use crate::{phase0::EpochProcess, Cancellation};

// Only used to avoid the overhead of storing penalties when reports are not needed.
pub trait SlashingPenalties: Default {
    fn add(&mut self, validator_index: ValidatorIndex, slashing_penalty: Gwei);
}

impl SlashingPenalties for () {
    fn add(&mut self, _validator_index: ValidatorIndex, _slashing_penalty: Gwei) {}
}

impl SlashingPenalties for HashMap<ValidatorIndex, Gwei> {
    fn add(&mut self, validator_index: ValidatorIndex, slashing_penalty: Gwei) {
        // Each validator appears in the to-slash queue at most once.
        self.insert(validator_index, slashing_penalty);
    }
}

/// Applies ejections, activation eligibility, and activations collected in `epoch_process`.
///
/// Mutations made before a failing read or write are not rolled back.
pub fn process_registry_updates(
    config: &Config,
    state: &mut impl BeaconState,
    epoch_process: &EpochProcess,
    cancellation: &Cancellation,
) -> Result<()> {
    cancellation.check()?;

    let EpochProcess {
        current_epoch,
        churn_limit,
        ..
    } = *epoch_process;

    process_ejections(config, state, epoch_process)?;

    // > Process activation eligibility
    let next_epoch = current_epoch
        .checked_add(1)
        .ok_or(HelperError::EpochOverflow)?;

    for validator_index in epoch_process
        .indices_to_set_activation_eligibility
        .iter()
        .copied()
    {
        state.set_activation_eligibility_epoch(validator_index, next_epoch)?;
    }

    debug!(
        count = epoch_process.indices_to_set_activation_eligibility.len(),
        activation_eligibility_epoch = next_epoch,
        "set activation eligibility",
    );

    // > Dequeued validators for activation up to churn limit
    let finalized_epoch = state.finalized_checkpoint().epoch;
    let activation_epoch = compute_activation_exit_epoch(config, current_epoch)?;
    let mut activated = 0_usize;

    for validator_index in epoch_process
        .indices_to_maybe_activate
        .iter()
        .copied()
        .take(usize::try_from(churn_limit)?)
    {
        // The queue is sorted by eligibility epoch, so no later validator can be eligible either.
        if epoch_process
            .status(validator_index)?
            .validator
            .activation_eligibility_epoch
            > finalized_epoch
        {
            break;
        }

        state.set_activation_epoch(validator_index, activation_epoch)?;
        activated += 1;
    }

    debug!(count = activated, activation_epoch, "activated validators");

    Ok(())
}

fn process_ejections(
    config: &Config,
    state: &mut impl BeaconState,
    epoch_process: &EpochProcess,
) -> Result<()> {
    let EpochProcess {
        churn_limit,
        mut exit_queue_end,
        exit_queue_end_churn: mut churn,
        ..
    } = *epoch_process;

    let mut ejected = 0_usize;

    for validator_index in epoch_process.indices_to_eject.iter().copied() {
        // Ejecting a validator that already has an exit epoch would assign it a second one.
        if state.validator(validator_index)?.exit_epoch != FAR_FUTURE_EPOCH {
            continue;
        }

        let withdrawable_epoch = exit_queue_end
            .checked_add(config.min_validator_withdrawability_delay)
            .ok_or(HelperError::EpochOverflow)?;

        state.set_exit_epoch(validator_index, exit_queue_end)?;
        state.set_withdrawable_epoch(validator_index, withdrawable_epoch)?;
        ejected += 1;

        churn += 1;

        if churn >= churn_limit {
            churn = 0;

            exit_queue_end = exit_queue_end
                .checked_add(1)
                .ok_or(HelperError::EpochOverflow)?;
        }
    }

    debug!(count = ejected, exit_queue_end, "ejected validators");

    Ok(())
}

/// Applies proportional slashing penalties to validators whose withdrawal is due in
/// `EPOCHS_PER_SLASHINGS_VECTOR / 2` epochs.
pub fn process_slashings<S: SlashingPenalties>(
    config: &Config,
    state: &mut impl BeaconState,
    epoch_process: &EpochProcess,
) -> Result<S> {
    let mut slashing_penalties = S::default();

    if epoch_process.indices_to_slash.is_empty() {
        return Ok(slashing_penalties);
    }

    let increment = config.effective_balance_increment;
    let total_active_stake = epoch_process.total_active_stake;

    let adjusted_total_slashing_balance = state
        .slashings_sum()?
        .checked_mul(config.proportional_slashing_multiplier)
        .ok_or(HelperError::GweiOverflow)?
        .min(total_active_stake.get());

    for validator_index in epoch_process.indices_to_slash.iter().copied() {
        let effective_balance = epoch_process
            .status(validator_index)?
            .validator
            .effective_balance;

        // > Factored out from penalty numerator to avoid uint64 overflow
        let penalty = (effective_balance / increment)
            .checked_mul_div(adjusted_total_slashing_balance, total_active_stake)
            .ok_or(HelperError::GweiOverflow)?
            * increment.get();

        decrease_balance(state, validator_index, penalty)?;

        slashing_penalties.add(validator_index, penalty);
    }

    debug!(
        slashed = ?epoch_process.indices_to_slash,
        adjusted_total_slashing_balance,
        "applied slashing penalties",
    );

    Ok(slashing_penalties)
}
