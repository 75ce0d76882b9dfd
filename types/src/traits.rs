//! Collaborators the state transition is written against.
//!
//! The transition never sees a concrete state representation.
//! Storage backends implement [`BeaconState`], shuffling caches implement [`CommitteeResolver`].

use anyhow::Result;

use crate::phase0::{
    containers::{Checkpoint, Fork, PendingAttestation, Validator},
    primitives::{CommitteeIndex, Epoch, Gwei, Slot, ValidatorIndex, H256},
};

pub trait HashTreeRoot {
    fn hash_tree_root(&self) -> H256;
}

/// Field-level access to a beacon state.
///
/// Every read or write may fail. Implementations backed by persistent trees report missing nodes
/// or out-of-range indices as errors instead of panicking.
pub trait BeaconState {
    fn slot(&self) -> Slot;
    fn fork(&self) -> Fork;
    fn genesis_validators_root(&self) -> H256;
    fn finalized_checkpoint(&self) -> Checkpoint;

    fn validator_count(&self) -> u64;

    fn validator(&self, validator_index: ValidatorIndex) -> Result<Validator>;

    /// Validators in index order.
    fn validators(&self) -> impl Iterator<Item = Result<Validator>>;

    fn set_activation_eligibility_epoch(
        &mut self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
    ) -> Result<()>;

    fn set_activation_epoch(&mut self, validator_index: ValidatorIndex, epoch: Epoch)
        -> Result<()>;

    fn set_exit_epoch(&mut self, validator_index: ValidatorIndex, epoch: Epoch) -> Result<()>;

    fn set_withdrawable_epoch(
        &mut self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
    ) -> Result<()>;

    fn set_slashed(&mut self, validator_index: ValidatorIndex, slashed: bool) -> Result<()>;

    fn balance(&self, validator_index: ValidatorIndex) -> Result<Gwei>;

    fn set_balance(&mut self, validator_index: ValidatorIndex, balance: Gwei) -> Result<()>;

    /// Root stored in the historical ring buffer at position `slot % SLOTS_PER_HISTORICAL_ROOT`.
    ///
    /// Callers are responsible for checking that `slot` is still covered by the buffer.
    fn stored_block_root(&self, slot: Slot) -> Result<H256>;

    /// Sum of the slashings vector.
    fn slashings_sum(&self) -> Result<Gwei>;

    /// Adds `amount` to the slashings vector entry for `epoch`.
    ///
    /// The vector is a ring buffer of `EPOCHS_PER_SLASHINGS_VECTOR` elements indexed by epoch.
    fn add_slashing(&mut self, epoch: Epoch, amount: Gwei) -> Result<()>;

    fn previous_epoch_attestations(&self) -> impl Iterator<Item = Result<PendingAttestation>>;

    fn current_epoch_attestations(&self) -> impl Iterator<Item = Result<PendingAttestation>>;
}

/// Resolves beacon committees from a precomputed shuffling.
pub trait CommitteeResolver {
    fn beacon_committee(&self, slot: Slot, committee_index: CommitteeIndex)
        -> Result<&[ValidatorIndex]>;
}
