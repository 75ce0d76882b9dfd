use thiserror::Error;
use types::phase0::{
    containers::{AttestationData, BeaconBlockHeader, Validator},
    primitives::{Epoch, Slot, ValidatorIndex},
};

use crate::ErrorKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation data is not slashable (data_1: {data_1:?}, data_2: {data_2:?})")]
    AttestationDataNotSlashable {
        data_1: AttestationData,
        data_2: AttestationData,
    },
    #[error("state transition was cancelled")]
    Cancelled,
    #[error("attestation for slot {slot} was included with zero delay")]
    InclusionDelayZero { slot: Slot },
    #[error("no attesters slashed")]
    NoAttestersSlashed,
    #[error("proposer {index} is not slashable: {proposer:?}")]
    ProposerNotSlashable {
        index: ValidatorIndex,
        proposer: Validator,
    },
    #[error("proposer slashing headers are identical: {header:?}")]
    ProposerSlashingHeadersIdentical { header: BeaconBlockHeader },
    #[error(
        "proposer slashing headers have different proposers \
         (proposer_index_1: {proposer_index_1}, proposer_index_2: {proposer_index_2})"
    )]
    ProposerSlashingProposerMismatch {
        proposer_index_1: ValidatorIndex,
        proposer_index_2: ValidatorIndex,
    },
    #[error("proposer slashing headers have different slots (slot_1: {slot_1}, slot_2: {slot_2})")]
    ProposerSlashingSlotMismatch { slot_1: Slot, slot_2: Slot },
    #[error("validator {index} has already exited (exit_epoch: {exit_epoch})")]
    ValidatorAlreadyExited { index: ValidatorIndex, exit_epoch: Epoch },
    #[error(
        "validator {index} has not been active long enough \
         (activation_epoch: {activation_epoch}, current_epoch: {current_epoch})"
    )]
    ValidatorHasNotBeenActiveLongEnough {
        index: ValidatorIndex,
        activation_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error("validator {index} is not active in epoch {current_epoch}: {validator:?}")]
    ValidatorNotActive {
        index: ValidatorIndex,
        validator: Validator,
        current_epoch: Epoch,
    },
    #[error(
        "validator {validator_index} referenced during epoch processing is not in the registry \
         (registry has {validator_count} validators)"
    )]
    ValidatorNotInRegistry {
        validator_index: ValidatorIndex,
        validator_count: u64,
    },
    #[error("voluntary exit is not valid until epoch {epoch} (current_epoch: {current_epoch})")]
    VoluntaryExitIsExpired { current_epoch: Epoch, epoch: Epoch },
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled => ErrorKind::Cancellation,
            Self::InclusionDelayZero { .. } | Self::ValidatorNotInRegistry { .. } => {
                ErrorKind::InvariantViolation
            }
            Self::AttestationDataNotSlashable { .. }
            | Self::NoAttestersSlashed
            | Self::ProposerNotSlashable { .. }
            | Self::ProposerSlashingHeadersIdentical { .. }
            | Self::ProposerSlashingProposerMismatch { .. }
            | Self::ProposerSlashingSlotMismatch { .. }
            | Self::ValidatorAlreadyExited { .. }
            | Self::ValidatorHasNotBeenActiveLongEnough { .. }
            | Self::ValidatorNotActive { .. }
            | Self::VoluntaryExitIsExpired { .. } => ErrorKind::Validation,
        }
    }
}
