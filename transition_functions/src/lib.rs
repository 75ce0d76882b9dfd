//! Phase 0 epoch processing and the block operations that share its validation rules.
//!
//! Every entry point takes the configuration, a state accessor, and (where signatures are
//! involved) a [`helper_functions::verifier::Verifier`] explicitly. Nothing is cached between calls
//! except what the caller passes in, such as [`pubkey_cache::PubkeyCache`].

pub use cancellation::Cancellation;
pub use error_kind::ErrorKind;

pub mod unphased {
    pub use block_processing::{
        process_attester_slashing, process_proposer_slashing, process_voluntary_exit,
        validate_attester_slashing, validate_attester_slashing_with_verifier,
        validate_proposer_slashing, validate_proposer_slashing_with_verifier,
        validate_voluntary_exit, validate_voluntary_exit_with_verifier,
    };
    pub use epoch_processing::{process_registry_updates, process_slashings, SlashingPenalties};
    pub use error::Error;

    mod block_processing;
    mod epoch_processing;
    mod error;
}

pub mod phase0 {
    pub use epoch_intermediates::{
        epoch_deltas, statistics, AttesterFlag, AttesterStatus, ComponentDeltas, Deltas,
        EpochProcess, EpochStakeSummary, Inclusion, ValidatorSnapshot,
    };
    pub use epoch_processing::{epoch_report, process_epoch_statistics, EpochReport};

    mod epoch_intermediates;
    mod epoch_processing;
}

mod cancellation;
mod error_kind;

#[cfg(test)]
mod test_utils;
