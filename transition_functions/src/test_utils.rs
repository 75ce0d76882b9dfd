use std::collections::HashMap;

use anyhow::{anyhow, Result};
use bitvec::{order::Lsb0, vec::BitVec};
use bls::SecretKey;
use pubkey_cache::PubkeyCache;
use types::{
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        consts::FAR_FUTURE_EPOCH,
        containers::{AttestationData, Checkpoint, PendingAttestation, Validator},
        primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex, H256},
    },
    traits::{BeaconState as _, CommitteeResolver},
};

pub const MAX_EFFECTIVE_BALANCE: u64 = 32_000_000_000;

// The last slot of epoch 2 in the minimal configuration.
pub const STATE_SLOT: Slot = 23;

#[derive(Default)]
pub struct StaticCommittees {
    committees: HashMap<(Slot, CommitteeIndex), Vec<ValidatorIndex>>,
}

impl StaticCommittees {
    pub fn with(
        mut self,
        slot: Slot,
        committee_index: CommitteeIndex,
        members: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Self {
        self.committees
            .insert((slot, committee_index), members.into_iter().collect());

        self
    }
}

impl CommitteeResolver for StaticCommittees {
    fn beacon_committee(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Result<&[ValidatorIndex]> {
        self.committees
            .get(&(slot, committee_index))
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("no committee {committee_index} in slot {slot}"))
    }
}

pub fn block_root(slot: Slot) -> H256 {
    H256::from_low_u64_be(slot + 1)
}

pub fn active_validator() -> Validator {
    Validator {
        effective_balance: MAX_EFFECTIVE_BALANCE,
        activation_eligibility_epoch: 0,
        activation_epoch: 0,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
        ..Validator::default()
    }
}

/// A state in the last slot of epoch 2 with distinct block roots for every slot.
///
/// Sized for `Config::minimal`.
pub fn state(validators: impl IntoIterator<Item = Validator>) -> Phase0BeaconState {
    let validators = validators.into_iter().collect::<Vec<_>>();

    Phase0BeaconState {
        slot: STATE_SLOT,
        block_roots: (0..64).map(block_root).collect(),
        balances: vec![MAX_EFFECTIVE_BALANCE; validators.len()],
        validators,
        ..Phase0BeaconState::default()
    }
}

pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let mut input_keying_material = [0x17; 32];
    input_keying_material[24..].copy_from_slice(&validator_index.to_be_bytes());
    SecretKey::key_gen(input_keying_material).expect("keying material is long enough")
}

/// A state in the first slot of `epoch` whose validators have real keys, with a loaded cache.
///
/// The slashings vector is sized for `Config::minimal`.
pub fn state_with_keys(count: u64, epoch: Epoch) -> (Phase0BeaconState, PubkeyCache) {
    let validators = (0..count).map(|validator_index| Validator {
        pubkey: secret_key(validator_index).to_public_key().to_bytes(),
        ..active_validator()
    });

    let state = Phase0BeaconState {
        slot: epoch * 8,
        slashings: vec![0; 64],
        ..state(validators)
    };

    let pubkey_cache = PubkeyCache::default();

    pubkey_cache
        .load_registry(state.validators())
        .expect("keys generated from secret keys are valid");

    (state, pubkey_cache)
}

pub struct Vote {
    pub slot: Slot,
    pub participation: &'static [bool],
    pub target_root: H256,
    pub head_root: H256,
    pub inclusion_delay: u64,
    pub proposer_index: ValidatorIndex,
}

impl Vote {
    /// A vote for the correct target and head of the epoch starting at `slot`.
    pub fn matching(slot: Slot, participation: &'static [bool]) -> Self {
        Self {
            slot,
            participation,
            target_root: block_root(slot),
            head_root: block_root(slot),
            inclusion_delay: 1,
            proposer_index: 0,
        }
    }

    pub fn into_pending_attestation(self) -> PendingAttestation {
        PendingAttestation {
            aggregation_bits: self.participation.iter().copied().collect::<BitVec<u8, Lsb0>>(),
            data: AttestationData {
                slot: self.slot,
                index: 0,
                beacon_block_root: self.head_root,
                source: Checkpoint::default(),
                target: Checkpoint {
                    epoch: self.slot / 8,
                    root: self.target_root,
                },
            },
            inclusion_delay: self.inclusion_delay,
            proposer_index: self.proposer_index,
        }
    }
}
