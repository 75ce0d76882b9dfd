use anyhow::{ensure, Result};
use bls::PublicKey;
use itertools::Itertools as _;
use pubkey_cache::PubkeyCache;
use types::{
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        consts::GENESIS_EPOCH,
        containers::AttesterSlashing,
        primitives::{Domain, DomainType, Epoch, Slot, ValidatorIndex, H256},
    },
    traits::BeaconState,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_current_epoch(config: &Config, state: &impl BeaconState) -> Epoch {
    misc::compute_epoch_at_slot(config, state.slot())
}

#[must_use]
pub fn get_previous_epoch(config: &Config, state: &impl BeaconState) -> Epoch {
    get_current_epoch(config, state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

#[must_use]
pub fn absolute_epoch(
    config: &Config,
    state: &impl BeaconState,
    attestation_epoch: AttestationEpoch,
) -> Epoch {
    match attestation_epoch {
        AttestationEpoch::Previous => get_previous_epoch(config, state),
        AttestationEpoch::Current => get_current_epoch(config, state),
    }
}

#[must_use]
pub fn get_finality_delay(config: &Config, state: &impl BeaconState) -> u64 {
    get_previous_epoch(config, state).saturating_sub(state.finalized_checkpoint().epoch)
}

/// Root of the block at the start of the previous or current epoch.
pub fn get_block_root(
    config: &Config,
    state: &impl BeaconState,
    attestation_epoch: AttestationEpoch,
) -> Result<H256> {
    let epoch = absolute_epoch(config, state, attestation_epoch);
    let slot = misc::compute_start_slot_at_epoch(config, epoch);
    get_block_root_at_slot(config, state, slot)
}

pub fn get_block_root_at_slot(config: &Config, state: &impl BeaconState, slot: Slot) -> Result<H256> {
    ensure!(slot < state.slot(), Error::SlotOutOfRange { slot });

    ensure!(
        state.slot() <= slot.saturating_add(config.slots_per_historical_root.get()),
        Error::SlotOutOfRange { slot },
    );

    state.stored_block_root(slot)
}

#[must_use]
pub fn get_domain(
    config: &Config,
    state: &impl BeaconState,
    domain_type: DomainType,
    epoch: Option<Epoch>,
) -> Domain {
    let epoch = epoch.unwrap_or_else(|| get_current_epoch(config, state));
    let fork = state.fork();

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    misc::compute_domain(
        config,
        domain_type,
        Some(fork_version),
        Some(state.genesis_validators_root()),
    )
}

/// Maximum number of validators whose activation or exit may take effect in one epoch.
#[must_use]
pub fn churn_limit(config: &Config, active_validator_count: u64) -> u64 {
    (active_validator_count / config.churn_limit_quotient).max(config.min_per_epoch_churn_limit)
}

pub fn get_validator_churn_limit(config: &Config, state: &impl BeaconState) -> Result<u64> {
    let current_epoch = get_current_epoch(config, state);

    let active_validator_count = state
        .validators()
        .process_results(|validators| {
            validators
                .filter(|validator| predicates::is_active_validator(validator, current_epoch))
                .count()
        })?;

    Ok(churn_limit(config, active_validator_count.try_into()?))
}

/// Indices present in both attestations of an attester slashing.
///
/// Both index lists must already be validated as strictly increasing.
pub fn slashable_indices(
    attester_slashing: &AttesterSlashing,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    misc::intersect_sorted(
        attester_slashing
            .attestation_1
            .attesting_indices
            .iter()
            .copied(),
        attester_slashing
            .attestation_2
            .attesting_indices
            .iter()
            .copied(),
    )
}

/// Looks up the decompressed key of a validator already known to be in the registry.
///
/// A miss means the cache was not loaded for the state being processed.
pub fn public_key(pubkey_cache: &PubkeyCache, validator_index: ValidatorIndex) -> Result<PublicKey> {
    pubkey_cache
        .get(validator_index)
        .ok_or_else(|| Error::PublicKeyNotCached { validator_index }.into())
}
