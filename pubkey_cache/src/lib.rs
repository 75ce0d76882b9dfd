use anyhow::Result;
use bls::{PublicKey, PublicKeyBytes};
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;
use types::phase0::{containers::Validator, primitives::ValidatorIndex};

/// Decompressed public keys of registered validators, keyed by validator index.
///
/// Decompression is expensive and a validator's key never changes once it is in the registry,
/// so keys are decompressed once and shared by every state that contains the validator.
/// Lookups take `&self`. The cache can be shared between threads.
#[derive(Default)]
pub struct PubkeyCache {
    keys: DashMap<ValidatorIndex, PublicKey>,
}

impl PubkeyCache {
    #[must_use]
    pub fn get(&self, validator_index: ValidatorIndex) -> Option<PublicKey> {
        self.keys.get(&validator_index).map(|entry| *entry)
    }

    pub fn get_or_insert(
        &self,
        validator_index: ValidatorIndex,
        bytes: PublicKeyBytes,
    ) -> Result<PublicKey> {
        if let Some(public_key) = self.get(validator_index) {
            return Ok(public_key);
        }

        let public_key = PublicKey::try_from(bytes)
            .map_err(|_| Error::InvalidPublicKey { validator_index })?;

        self.keys.insert(validator_index, public_key);

        Ok(public_key)
    }

    /// Decompresses keys of validators not yet in the cache.
    ///
    /// `validators` must yield the whole registry in index order.
    /// Validators already cached are skipped without decompressing their keys again.
    pub fn load_registry(&self, validators: impl IntoIterator<Item = Result<Validator>>) -> Result<()> {
        let mut loaded = 0_usize;

        for (validator_index, validator) in (0..).zip(validators) {
            if self.keys.contains_key(&validator_index) {
                continue;
            }

            self.get_or_insert(validator_index, validator?.pubkey)?;
            loaded += 1;
        }

        debug!(loaded, total = self.len(), "loaded validator public keys");

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("public key of validator {validator_index} is not a valid G1 point")]
    InvalidPublicKey { validator_index: ValidatorIndex },
}
