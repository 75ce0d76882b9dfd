use core::cmp::Ordering;

use anyhow::Result;
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    traits::BeaconState,
};

use crate::{
    accessors::{get_current_epoch, get_validator_churn_limit},
    error::Error,
    misc::compute_activation_exit_epoch,
};

pub fn increase_balance(
    state: &mut impl BeaconState,
    validator_index: ValidatorIndex,
    delta: Gwei,
) -> Result<()> {
    let balance = state
        .balance(validator_index)?
        .checked_add(delta)
        .ok_or(Error::GweiOverflow)?;

    state.set_balance(validator_index, balance)
}

pub fn decrease_balance(
    state: &mut impl BeaconState,
    validator_index: ValidatorIndex,
    delta: Gwei,
) -> Result<()> {
    let balance = state.balance(validator_index)?.saturating_sub(delta);
    state.set_balance(validator_index, balance)
}

pub fn initiate_validator_exit(
    config: &Config,
    state: &mut impl BeaconState,
    validator_index: ValidatorIndex,
) -> Result<()> {
    // > Return if validator already initiated exit
    if state.validator(validator_index)?.exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }

    // > Compute exit queue epoch
    let mut exit_queue_epoch = compute_activation_exit_epoch(config, get_current_epoch(config, state))?;
    let mut exit_queue_churn = 0;

    let exit_epochs = state
        .validators()
        .map_ok(|validator| validator.exit_epoch)
        .filter_ok(|exit_epoch| *exit_epoch != FAR_FUTURE_EPOCH);

    for exit_epoch in exit_epochs {
        let exit_epoch = exit_epoch?;

        match exit_epoch.cmp(&exit_queue_epoch) {
            Ordering::Less => {}
            Ordering::Equal => exit_queue_churn += 1,
            Ordering::Greater => {
                exit_queue_epoch = exit_epoch;
                exit_queue_churn = 1;
            }
        }
    }

    if exit_queue_churn >= get_validator_churn_limit(config, state)? {
        exit_queue_epoch = exit_queue_epoch
            .checked_add(1)
            .ok_or(Error::EpochOverflow)?;
    }

    // > Set validator exit epoch and withdrawable epoch
    let withdrawable_epoch = exit_queue_epoch
        .checked_add(config.min_validator_withdrawability_delay)
        .ok_or(Error::EpochOverflow)?;

    state.set_exit_epoch(validator_index, exit_queue_epoch)?;
    state.set_withdrawable_epoch(validator_index, withdrawable_epoch)
}

/// Slashes `slashed_index` and rewards the whistleblower and the proposer of the including block.
///
/// Without an explicit `whistleblower_index` the proposer receives the whole reward.
pub fn slash_validator(
    config: &Config,
    state: &mut impl BeaconState,
    slashed_index: ValidatorIndex,
    proposer_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
) -> Result<()> {
    initiate_validator_exit(config, state, slashed_index)?;

    let epoch = get_current_epoch(config, state);
    let validator = state.validator(slashed_index)?;
    let effective_balance = validator.effective_balance;
    let slashing_penalty = effective_balance / config.min_slashing_penalty_quotient;

    let withdrawable_epoch = epoch
        .checked_add(config.epochs_per_slashings_vector.get())
        .ok_or(Error::EpochOverflow)?
        .max(validator.withdrawable_epoch);

    state.set_slashed(slashed_index, true)?;
    state.set_withdrawable_epoch(slashed_index, withdrawable_epoch)?;
    state.add_slashing(epoch, effective_balance)?;

    decrease_balance(state, slashed_index, slashing_penalty)?;

    // > Apply proposer and whistleblower rewards
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward = effective_balance / config.whistleblower_reward_quotient;
    let proposer_reward = whistleblower_reward / config.proposer_reward_quotient;
    let remaining_reward = whistleblower_reward - proposer_reward;

    increase_balance(state, proposer_index, proposer_reward)?;
    increase_balance(state, whistleblower_index, remaining_reward)
}
