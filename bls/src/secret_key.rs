use blst::min_pk::SecretKey as RawSecretKey;

use crate::{error::Error, public_key::PublicKey, signature::Signature, DOMAIN_SEPARATION_TAG};

#[derive(derive_more::Debug)]
#[debug("[REDACTED]")]
pub struct SecretKey(RawSecretKey);

impl SecretKey {
    /// Derives a key from at least 32 bytes of input keying material.
    pub fn key_gen(input_keying_material: impl AsRef<[u8]>) -> Result<Self, Error> {
        RawSecretKey::key_gen(input_keying_material.as_ref(), &[])
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }

    #[inline]
    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        self.0.sk_to_pk().into()
    }

    #[inline]
    #[must_use]
    pub fn sign(&self, message: impl AsRef<[u8]>) -> Signature {
        self.0
            .sign(message.as_ref(), DOMAIN_SEPARATION_TAG, &[])
            .into()
    }
}
