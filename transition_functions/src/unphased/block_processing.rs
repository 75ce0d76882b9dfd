use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{get_current_epoch, public_key, slashable_indices},
    error::{Error as HelperError, SignatureKind},
    mutators::{initiate_validator_exit, slash_validator},
    predicates::{
        is_active_validator, is_slashable_attestation_data, is_slashable_validator,
        validate_indexed_attestation,
    },
    signing::SignForSingleFork as _,
    verifier::{SingleVerifier, Verifier},
};
use pubkey_cache::PubkeyCache;
use tracing::trace;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        containers::{AttesterSlashing, ProposerSlashing, SignedVoluntaryExit},
        primitives::ValidatorIndex,
    },
    traits::BeaconState,
};

use crate::unphased::Error;

/// Slashes the proposer named in `proposer_slashing`.
///
/// `proposer_index` is the proposer of the block that includes the slashing.
pub fn process_proposer_slashing(
    config: &Config,
    state: &mut impl BeaconState,
    pubkey_cache: &PubkeyCache,
    proposer_slashing: ProposerSlashing,
    proposer_index: ValidatorIndex,
    verifier: impl Verifier,
) -> Result<()> {
    validate_proposer_slashing_with_verifier(
        config,
        state,
        pubkey_cache,
        proposer_slashing,
        verifier,
    )?;

    let slashed_index = proposer_slashing.signed_header_1.message.proposer_index;

    slash_validator(config, state, slashed_index, proposer_index, None)
}

pub fn validate_proposer_slashing(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    proposer_slashing: ProposerSlashing,
) -> Result<()> {
    validate_proposer_slashing_with_verifier(
        config,
        state,
        pubkey_cache,
        proposer_slashing,
        SingleVerifier,
    )
}

pub fn validate_proposer_slashing_with_verifier(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    proposer_slashing: ProposerSlashing,
    mut verifier: impl Verifier,
) -> Result<()> {
    let header_1 = proposer_slashing.signed_header_1.message;
    let header_2 = proposer_slashing.signed_header_2.message;

    // > Verify header slots match
    ensure!(
        header_1.slot == header_2.slot,
        Error::ProposerSlashingSlotMismatch {
            slot_1: header_1.slot,
            slot_2: header_2.slot,
        },
    );

    // > Verify header proposer indices match
    ensure!(
        header_1.proposer_index == header_2.proposer_index,
        Error::ProposerSlashingProposerMismatch {
            proposer_index_1: header_1.proposer_index,
            proposer_index_2: header_2.proposer_index,
        },
    );

    // > Verify the headers are different
    ensure!(
        header_1 != header_2,
        Error::ProposerSlashingHeadersIdentical { header: header_1 },
    );

    let index = header_1.proposer_index;
    let validator_count = state.validator_count();

    ensure!(
        index < validator_count,
        HelperError::ValidatorIndexOutOfBounds {
            validator_index: index,
            validator_count,
        },
    );

    // > Verify the proposer is slashable
    let proposer = state.validator(index)?;

    ensure!(
        is_slashable_validator(&proposer, get_current_epoch(config, state)),
        Error::ProposerNotSlashable { index, proposer },
    );

    // > Verify signatures
    let proposer_key = public_key(pubkey_cache, index)?;

    for signed_header in [
        proposer_slashing.signed_header_1,
        proposer_slashing.signed_header_2,
    ] {
        verifier.verify_singular(
            signed_header.message.signing_root(config, state),
            signed_header.signature,
            &proposer_key,
            SignatureKind::Block,
        )?;
    }

    Ok(())
}

/// Slashes every validator that `attester_slashing` proves to have made conflicting votes.
///
/// `proposer_index` is the proposer of the block that includes the slashing.
pub fn process_attester_slashing(
    config: &Config,
    state: &mut impl BeaconState,
    pubkey_cache: &PubkeyCache,
    attester_slashing: &AttesterSlashing,
    proposer_index: ValidatorIndex,
    verifier: impl Verifier,
) -> Result<()> {
    let slashable_indices = validate_attester_slashing_with_verifier(
        config,
        state,
        pubkey_cache,
        attester_slashing,
        verifier,
    )?;

    for validator_index in slashable_indices {
        slash_validator(config, state, validator_index, proposer_index, None)?;
    }

    Ok(())
}

pub fn validate_attester_slashing(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    attester_slashing: &AttesterSlashing,
) -> Result<Vec<ValidatorIndex>> {
    validate_attester_slashing_with_verifier(
        config,
        state,
        pubkey_cache,
        attester_slashing,
        SingleVerifier,
    )
}

/// Returns the indices of validators that can be slashed for `attester_slashing`.
pub fn validate_attester_slashing_with_verifier(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    attester_slashing: &AttesterSlashing,
    mut verifier: impl Verifier,
) -> Result<Vec<ValidatorIndex>> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    let data_1 = attestation_1.data;
    let data_2 = attestation_2.data;

    ensure!(
        is_slashable_attestation_data(data_1, data_2),
        Error::AttestationDataNotSlashable { data_1, data_2 },
    );

    validate_indexed_attestation(config, state, pubkey_cache, attestation_1, &mut verifier)?;
    validate_indexed_attestation(config, state, pubkey_cache, attestation_2, verifier)?;

    let current_epoch = get_current_epoch(config, state);
    let mut slashable = vec![];

    for attester_index in slashable_indices(attester_slashing) {
        if is_slashable_validator(&state.validator(attester_index)?, current_epoch) {
            slashable.push(attester_index);
        }
    }

    ensure!(!slashable.is_empty(), Error::NoAttestersSlashed);

    trace!(?slashable, "attester slashing is valid");

    Ok(slashable)
}

pub fn process_voluntary_exit(
    config: &Config,
    state: &mut impl BeaconState,
    pubkey_cache: &PubkeyCache,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    validate_voluntary_exit_with_verifier(
        config,
        state,
        pubkey_cache,
        signed_voluntary_exit,
        verifier,
    )?;

    // > Initiate exit
    initiate_validator_exit(config, state, signed_voluntary_exit.message.validator_index)
}

pub fn validate_voluntary_exit(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    signed_voluntary_exit: SignedVoluntaryExit,
) -> Result<()> {
    validate_voluntary_exit_with_verifier(
        config,
        state,
        pubkey_cache,
        signed_voluntary_exit,
        SingleVerifier,
    )
}

pub fn validate_voluntary_exit_with_verifier(
    config: &Config,
    state: &impl BeaconState,
    pubkey_cache: &PubkeyCache,
    signed_voluntary_exit: SignedVoluntaryExit,
    mut verifier: impl Verifier,
) -> Result<()> {
    let voluntary_exit = signed_voluntary_exit.message;
    let index = voluntary_exit.validator_index;
    let validator_count = state.validator_count();

    ensure!(
        index < validator_count,
        HelperError::ValidatorIndexOutOfBounds {
            validator_index: index,
            validator_count,
        },
    );

    let validator = state.validator(index)?;
    let current_epoch = get_current_epoch(config, state);

    // > Verify the validator is active
    ensure!(
        is_active_validator(&validator, current_epoch),
        Error::ValidatorNotActive {
            index,
            validator,
            current_epoch,
        },
    );

    // > Verify exit has not been initiated
    ensure!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        Error::ValidatorAlreadyExited {
            index,
            exit_epoch: validator.exit_epoch,
        },
    );

    // > Exits must specify an epoch when they become valid; they are not valid before then
    ensure!(
        current_epoch >= voluntary_exit.epoch,
        Error::VoluntaryExitIsExpired {
            current_epoch,
            epoch: voluntary_exit.epoch,
        },
    );

    // > Verify the validator has been active long enough
    let active_long_enough_epoch = validator
        .activation_epoch
        .checked_add(config.shard_committee_period)
        .ok_or(HelperError::EpochOverflow)?;

    ensure!(
        current_epoch >= active_long_enough_epoch,
        Error::ValidatorHasNotBeenActiveLongEnough {
            index,
            activation_epoch: validator.activation_epoch,
            current_epoch,
        },
    );

    // > Verify signature
    verifier.verify_singular(
        voluntary_exit.signing_root(config, state),
        signed_voluntary_exit.signature,
        &public_key(pubkey_cache, index)?,
        SignatureKind::VoluntaryExit,
    )
}
