use anyhow::Result;
use bls::{PublicKey, SecretKey, Signature, SignatureBytes};
use types::{
    config::Config,
    phase0::{
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_VOLUNTARY_EXIT},
        containers::{AttestationData, BeaconBlockHeader, VoluntaryExit},
        primitives::{DomainType, Epoch, H256},
    },
    traits::{BeaconState, HashTreeRoot},
};

use crate::{
    accessors,
    error::SignatureKind,
    misc,
    verifier::{SingleVerifier, Verifier as _},
};

/// Messages signed under a domain that depends on the fork active at [`Self::epoch`].
pub trait SignForSingleFork: HashTreeRoot {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn epoch(&self, config: &Config) -> Epoch;

    fn signing_root(&self, config: &Config, beacon_state: &impl BeaconState) -> H256 {
        let epoch = Some(self.epoch(config));
        let domain = accessors::get_domain(config, beacon_state, Self::DOMAIN_TYPE, epoch);
        misc::compute_signing_root(self, domain)
    }

    fn sign(
        &self,
        config: &Config,
        beacon_state: &impl BeaconState,
        secret_key: &SecretKey,
    ) -> Signature {
        secret_key.sign(self.signing_root(config, beacon_state))
    }

    fn verify(
        &self,
        config: &Config,
        beacon_state: &impl BeaconState,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
    ) -> Result<()> {
        SingleVerifier.verify_singular(
            self.signing_root(config, beacon_state),
            signature_bytes,
            public_key,
            Self::SIGNATURE_KIND,
        )
    }
}

impl SignForSingleFork for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Attestation;

    fn epoch(&self, _config: &Config) -> Epoch {
        self.target.epoch
    }
}

impl SignForSingleFork for BeaconBlockHeader {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;

    fn epoch(&self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, self.slot)
    }
}

impl SignForSingleFork for VoluntaryExit {
    const DOMAIN_TYPE: DomainType = DOMAIN_VOLUNTARY_EXIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::VoluntaryExit;

    fn epoch(&self, _config: &Config) -> Epoch {
        self.epoch
    }
}
