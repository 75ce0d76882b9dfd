use parse_display::Display;
use thiserror::Error;
use types::phase0::primitives::{Slot, ValidatorIndex};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation has no attesting indices")]
    AttestationHasNoAttestingIndices,
    #[error("attesting indices are not sorted")]
    AttestingIndicesNotSorted,
    #[error("validator {validator_index} appears in attesting indices more than once")]
    AttestingIndicesNotUnique { validator_index: ValidatorIndex },
    #[error("attestation has {count} attesting indices, which is more than {maximum}")]
    TooManyAttestingIndices { count: usize, maximum: u64 },
    #[error("aggregation bitlist length {aggregation_bitlist_length} does not match committee length {committee_length}")]
    CommitteeLengthMismatch {
        aggregation_bitlist_length: usize,
        committee_length: usize,
    },
    #[error("epoch number overflowed")]
    EpochOverflow,
    #[error("balance overflowed")]
    GweiOverflow,
    #[error("public key of validator {validator_index} is not in the cache")]
    PublicKeyNotCached { validator_index: ValidatorIndex },
    #[error("{0} is invalid")]
    SignatureInvalid(SignatureKind),
    #[error("slot {slot} is out of range of stored block roots")]
    SlotOutOfRange { slot: Slot },
    #[error("validator index {validator_index} is out of bounds (registry has {validator_count} validators)")]
    ValidatorIndexOutOfBounds {
        validator_index: ValidatorIndex,
        validator_count: u64,
    },
}

impl Error {
    /// Whether the error indicates a bug or corrupted state rather than an invalid message.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::CommitteeLengthMismatch { .. }
                | Self::EpochOverflow
                | Self::GweiOverflow
                | Self::PublicKeyNotCached { .. },
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum SignatureKind {
    #[display("attestation signature")]
    Attestation,
    #[display("block signature")]
    Block,
    #[display("voluntary exit signature")]
    VoluntaryExit,
}
