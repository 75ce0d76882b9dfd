use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    phase0::{
        containers::{Checkpoint, Fork, PendingAttestation, Validator},
        primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256},
    },
    traits::BeaconState as BeaconStateTrait,
};

/// A beacon state held entirely in memory.
///
/// Only the fields read or written by epoch processing and the operations in
/// `transition_functions` are present. `block_roots` is a ring buffer indexed by
/// `slot % block_roots.len()`, so it must have `SLOTS_PER_HISTORICAL_ROOT` elements to match
/// the configuration in use.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconState {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    pub genesis_validators_root: H256,
    pub fork: Fork,
    pub block_roots: Vec<H256>,
    pub validators: Vec<Validator>,
    #[serde(with = "serde_utils::string_or_native_sequence")]
    pub balances: Vec<Gwei>,
    #[serde(with = "serde_utils::string_or_native_sequence")]
    pub slashings: Vec<Gwei>,
    pub previous_epoch_attestations: Vec<PendingAttestation>,
    pub current_epoch_attestations: Vec<PendingAttestation>,
    pub finalized_checkpoint: Checkpoint,
}

impl BeaconState {
    fn validator_mut(&mut self, validator_index: ValidatorIndex) -> Result<&mut Validator> {
        let validator_count = self.validators.len();

        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.validators.get_mut(index))
            .ok_or_else(|| {
                Error::ValidatorIndexOutOfBounds {
                    validator_index,
                    validator_count,
                }
                .into()
            })
    }

    fn balance_mut(&mut self, validator_index: ValidatorIndex) -> Result<&mut Gwei> {
        let validator_count = self.balances.len();

        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.balances.get_mut(index))
            .ok_or_else(|| {
                Error::ValidatorIndexOutOfBounds {
                    validator_index,
                    validator_count,
                }
                .into()
            })
    }
}

impl BeaconStateTrait for BeaconState {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn fork(&self) -> Fork {
        self.fork
    }

    fn genesis_validators_root(&self) -> H256 {
        self.genesis_validators_root
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn validator_count(&self) -> u64 {
        self.validators.len() as u64
    }

    fn validator(&self, validator_index: ValidatorIndex) -> Result<Validator> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.validators.get(index))
            .copied()
            .ok_or_else(|| {
                Error::ValidatorIndexOutOfBounds {
                    validator_index,
                    validator_count: self.validators.len(),
                }
                .into()
            })
    }

    fn validators(&self) -> impl Iterator<Item = Result<Validator>> {
        self.validators.iter().copied().map(Ok)
    }

    fn set_activation_eligibility_epoch(
        &mut self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
    ) -> Result<()> {
        self.validator_mut(validator_index)?.activation_eligibility_epoch = epoch;
        Ok(())
    }

    fn set_activation_epoch(
        &mut self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
    ) -> Result<()> {
        self.validator_mut(validator_index)?.activation_epoch = epoch;
        Ok(())
    }

    fn set_exit_epoch(&mut self, validator_index: ValidatorIndex, epoch: Epoch) -> Result<()> {
        self.validator_mut(validator_index)?.exit_epoch = epoch;
        Ok(())
    }

    fn set_withdrawable_epoch(
        &mut self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
    ) -> Result<()> {
        self.validator_mut(validator_index)?.withdrawable_epoch = epoch;
        Ok(())
    }

    fn set_slashed(&mut self, validator_index: ValidatorIndex, slashed: bool) -> Result<()> {
        self.validator_mut(validator_index)?.slashed = slashed;
        Ok(())
    }

    fn balance(&self, validator_index: ValidatorIndex) -> Result<Gwei> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.balances.get(index))
            .copied()
            .ok_or_else(|| {
                Error::ValidatorIndexOutOfBounds {
                    validator_index,
                    validator_count: self.balances.len(),
                }
                .into()
            })
    }

    fn set_balance(&mut self, validator_index: ValidatorIndex, balance: Gwei) -> Result<()> {
        *self.balance_mut(validator_index)? = balance;
        Ok(())
    }

    fn stored_block_root(&self, slot: Slot) -> Result<H256> {
        let length = self.block_roots.len() as u64;

        slot.checked_rem(length)
            .and_then(|position| usize::try_from(position).ok())
            .and_then(|position| self.block_roots.get(position))
            .copied()
            .ok_or_else(|| Error::BlockRootsEmpty.into())
    }

    fn slashings_sum(&self) -> Result<Gwei> {
        self.slashings
            .iter()
            .try_fold(0, |sum: Gwei, amount| sum.checked_add(*amount))
            .ok_or_else(|| Error::SlashingsOverflow.into())
    }

    fn add_slashing(&mut self, epoch: Epoch, amount: Gwei) -> Result<()> {
        let length = self.slashings.len() as u64;

        let slashing = epoch
            .checked_rem(length)
            .and_then(|position| usize::try_from(position).ok())
            .and_then(|position| self.slashings.get_mut(position))
            .ok_or(Error::SlashingsEmpty)?;

        *slashing = slashing
            .checked_add(amount)
            .ok_or(Error::SlashingsOverflow)?;

        Ok(())
    }

    fn previous_epoch_attestations(&self) -> impl Iterator<Item = Result<PendingAttestation>> {
        self.previous_epoch_attestations.iter().cloned().map(Ok)
    }

    fn current_epoch_attestations(&self) -> impl Iterator<Item = Result<PendingAttestation>> {
        self.current_epoch_attestations.iter().cloned().map(Ok)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("state has no block roots")]
    BlockRootsEmpty,
    #[error("state has no slashings vector")]
    SlashingsEmpty,
    #[error("slashings overflowed")]
    SlashingsOverflow,
    #[error("validator index {validator_index} is out of bounds (list has {validator_count} elements)")]
    ValidatorIndexOutOfBounds {
        validator_index: ValidatorIndex,
        validator_count: usize,
    },
}
