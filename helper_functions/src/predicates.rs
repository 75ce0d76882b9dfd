use anyhow::{ensure, Result};
use itertools::Itertools as _;
use pubkey_cache::PubkeyCache;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        containers::{AttestationData, IndexedAttestation, Validator},
        primitives::{Epoch, ValidatorIndex},
    },
    traits::BeaconState,
};

use crate::{
    accessors,
    error::{Error, SignatureKind},
    signing::SignForSingleFork as _,
    verifier::Verifier,
};

// > Check if ``validator`` is active.
#[inline]
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// > Check if ``validator`` is eligible to be placed into the activation queue.
#[must_use]
pub const fn is_eligible_for_activation_queue(config: &Config, validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == config.max_effective_balance
}

#[inline]
#[must_use]
pub const fn is_eligible_for_penalties(validator: &Validator, previous_epoch: Epoch) -> bool {
    is_active_validator(validator, previous_epoch)
        || (validator.slashed && previous_epoch.saturating_add(1) < validator.withdrawable_epoch)
}

// > Check if ``validator`` is slashable.
#[inline]
#[must_use]
pub const fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch <= epoch
        && epoch < validator.withdrawable_epoch
}

/// Checks if `data_1` and `data_2` are slashable according to Casper FFG rules.
///
/// The relation is not symmetric for surround votes.
/// `data_1` must be the surrounding vote.
#[inline]
#[must_use]
pub fn is_slashable_attestation_data(data_1: AttestationData, data_2: AttestationData) -> bool {
    // > Double vote
    let double_vote = data_1 != data_2 && data_1.target.epoch == data_2.target.epoch;

    // > Surround vote
    let surround_vote =
        data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch;

    double_vote || surround_vote
}

#[must_use]
pub fn is_in_inactivity_leak(config: &Config, state: &impl BeaconState) -> bool {
    accessors::get_finality_delay(config, state) > config.min_epochs_to_inactivity_penalty
}

/// Checks that attesting indices are non-empty, strictly increasing, and not too numerous.
///
/// The length bound is checked first so that oversized input is rejected without scanning it.
pub fn validate_index_set(config: &Config, indices: &[ValidatorIndex]) -> Result<()> {
    let maximum = config.max_validators_per_committee.get();

    ensure!(
        u64::try_from(indices.len()).is_ok_and(|count| count <= maximum),
        Error::TooManyAttestingIndices {
            count: indices.len(),
            maximum,
        },
    );

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);

    ensure!(
        indices.iter().tuple_windows().all(|(a, b)| a <= b),
        Error::AttestingIndicesNotSorted,
    );

    if let Some((validator_index, _)) = indices.iter().tuple_windows().find(|(a, b)| a == b) {
        return Err(Error::AttestingIndicesNotUnique {
            validator_index: *validator_index,
        }
        .into());
    }

    Ok(())
}

/// [`validate_index_set`] followed by a check that every index is in the registry.
///
/// Only the last index needs to be checked because the indices are strictly increasing.
pub fn validate_against_state(
    config: &Config,
    state: &impl BeaconState,
    indexed_attestation: &IndexedAttestation,
) -> Result<()> {
    let indices = indexed_attestation.attesting_indices.as_slice();

    validate_index_set(config, indices)?;

    let validator_count = state.validator_count();

    if let Some(&validator_index) = indices.last() {
        ensure!(
            validator_index < validator_count,
            Error::ValidatorIndexOutOfBounds {
                validator_index,
                validator_count,
            },
        );
    }

    Ok(())
}

/// Verifies the aggregate signature of an attestation whose indices have already been validated.
pub fn validate_signature(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    indexed_attestation: &IndexedAttestation,
    mut verifier: impl Verifier,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    let public_keys = indices
        .iter()
        .map(|validator_index| accessors::public_key(pubkey_cache, *validator_index))
        .collect::<Result<Vec<_>>>()?;

    ensure!(!public_keys.is_empty(), Error::AttestationHasNoAttestingIndices);

    verifier.verify_aggregate(
        indexed_attestation.data.signing_root(config, state),
        indexed_attestation.signature,
        &public_keys,
        SignatureKind::Attestation,
    )
}

pub fn validate_indexed_attestation(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    indexed_attestation: &IndexedAttestation,
    verifier: impl Verifier,
) -> Result<()> {
    validate_against_state(config, state, indexed_attestation)?;
    validate_signature(config, state, pubkey_cache, indexed_attestation, verifier)
}
