use bls::SecretKey;
use itertools::Itertools as _;
use pubkey_cache::PubkeyCache;
use types::{
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        consts::FAR_FUTURE_EPOCH,
        containers::Validator,
        primitives::ValidatorIndex,
    },
    traits::BeaconState as _,
};

pub fn active_validator() -> Validator {
    Validator {
        effective_balance: 32_000_000_000,
        activation_eligibility_epoch: 0,
        activation_epoch: 0,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
        ..Validator::default()
    }
}

pub fn state_with_active_validators(count: usize) -> Phase0BeaconState {
    Phase0BeaconState {
        validators: vec![active_validator(); count],
        balances: vec![32_000_000_000; count],
        ..Phase0BeaconState::default()
    }
}

pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let mut input_keying_material = [0x42; 32];
    input_keying_material[..8].copy_from_slice(&validator_index.to_le_bytes());
    SecretKey::key_gen(input_keying_material).expect("keying material is long enough")
}

/// A state whose validators have real keys, along with a cache already loaded from it.
pub fn state_with_keys(count: u64) -> (Phase0BeaconState, PubkeyCache) {
    let validators = (0..count)
        .map(|validator_index| Validator {
            pubkey: secret_key(validator_index).to_public_key().to_bytes(),
            ..active_validator()
        })
        .collect_vec();

    let state = Phase0BeaconState {
        balances: vec![32_000_000_000; validators.len()],
        validators,
        ..Phase0BeaconState::default()
    };

    let pubkey_cache = PubkeyCache::default();

    pubkey_cache
        .load_registry(state.validators())
        .expect("keys generated from secret keys are valid");

    (state, pubkey_cache)
}
