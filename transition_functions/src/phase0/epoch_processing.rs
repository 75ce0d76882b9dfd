use std::collections::HashMap;

use anyhow::Result;
use types::{
    config::Config,
    phase0::primitives::{Gwei, ValidatorIndex},
    traits::{BeaconState, CommitteeResolver},
};

use crate::{
    phase0::epoch_intermediates::{self, Deltas, EpochProcess},
    unphased::{self, SlashingPenalties},
    Cancellation,
};

/// Everything an epoch transition computes, for tools that inspect transitions.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EpochReport {
    pub epoch_process: EpochProcess,
    pub epoch_deltas: Deltas,
    pub slashing_penalties: HashMap<ValidatorIndex, Gwei>,
}

/// Collects epoch statistics and applies the registry updates and slashings that follow from them.
///
/// Rewards and penalties are not applied. Compute them with [`crate::phase0::epoch_deltas`]
/// from the returned [`EpochProcess`].
pub fn process_epoch_statistics(
    config: &Config,
    state: &mut impl BeaconState,
    committees: &impl CommitteeResolver,
    cancellation: &Cancellation,
) -> Result<EpochProcess> {
    let (epoch_process, ()) = process_epoch(config, state, committees, cancellation)?;
    Ok(epoch_process)
}

pub fn epoch_report(
    config: &Config,
    state: &mut impl BeaconState,
    committees: &impl CommitteeResolver,
    cancellation: &Cancellation,
) -> Result<EpochReport> {
    // Deltas depend on finality and on statuses, neither of which registry updates change.
    let (epoch_process, slashing_penalties) =
        process_epoch(config, state, committees, cancellation)?;

    let epoch_deltas = epoch_intermediates::epoch_deltas(config, state, &epoch_process)?;

    Ok(EpochReport {
        epoch_process,
        epoch_deltas,
        slashing_penalties,
    })
}

fn process_epoch<S: SlashingPenalties>(
    config: &Config,
    state: &mut impl BeaconState,
    committees: &impl CommitteeResolver,
    cancellation: &Cancellation,
) -> Result<(EpochProcess, S)> {
    let epoch_process = epoch_intermediates::statistics(config, state, committees, cancellation)?;

    unphased::process_registry_updates(config, state, &epoch_process, cancellation)?;

    let slashing_penalties = unphased::process_slashings(config, state, &epoch_process)?;

    Ok((epoch_process, slashing_penalties))
}
