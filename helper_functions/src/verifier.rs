#![expect(clippy::module_name_repetitions)]

use anyhow::{ensure, Result};
use bls::{PublicKey, Signature, SignatureBytes};
use types::phase0::primitives::H256;

use crate::error::{Error, SignatureKind};

/// Signature checks performed during state transitions.
///
/// Functions that verify signatures take `impl Verifier` so that trusted input can be processed
/// with [`NullVerifier`] without duplicating the validation logic.
pub trait Verifier {
    const IS_NULL: bool;

    fn verify_singular(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
        signature_kind: SignatureKind,
    ) -> Result<()>;

    fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        signature_kind: SignatureKind,
    ) -> Result<()>;
}

impl<V: Verifier> Verifier for &mut V {
    const IS_NULL: bool = V::IS_NULL;

    #[inline]
    fn verify_singular(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_singular(message, signature_bytes, public_key, signature_kind)
    }

    #[inline]
    fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_aggregate(message, signature_bytes, public_keys, signature_kind)
    }
}

pub struct NullVerifier;

impl Verifier for NullVerifier {
    const IS_NULL: bool = true;

    #[inline]
    fn verify_singular(
        &mut self,
        _message: H256,
        _signature_bytes: SignatureBytes,
        _public_key: &PublicKey,
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn verify_aggregate<'keys>(
        &mut self,
        _message: H256,
        _signature_bytes: SignatureBytes,
        _public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }
}

pub struct SingleVerifier;

impl Verifier for SingleVerifier {
    const IS_NULL: bool = false;

    fn verify_singular(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        let signature = decompress(signature_bytes, signature_kind)?;

        ensure!(
            signature.verify(message, public_key),
            Error::SignatureInvalid(signature_kind),
        );

        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        let signature = decompress(signature_bytes, signature_kind)?;

        ensure!(
            signature.fast_aggregate_verify(message, public_keys),
            Error::SignatureInvalid(signature_kind),
        );

        Ok(())
    }
}

// Malformed signature bytes are reported the same way as signatures that fail verification.
fn decompress(signature_bytes: SignatureBytes, signature_kind: SignatureKind) -> Result<Signature> {
    Signature::try_from(signature_bytes).map_err(|_| Error::SignatureInvalid(signature_kind).into())
}

#[cfg(test)]
mod tests {
    use bls::SecretKey;

    use super::*;

    fn secret_key(seed: u8) -> SecretKey {
        SecretKey::key_gen([seed; 32]).expect("keying material is long enough")
    }

    #[test]
    fn single_verifier_accepts_valid_signature() -> Result<()> {
        let secret_key = secret_key(1);
        let message = H256::repeat_byte(7);
        let signature_bytes = secret_key.sign(message).to_bytes();

        SingleVerifier.verify_singular(
            message,
            signature_bytes,
            &secret_key.to_public_key(),
            SignatureKind::VoluntaryExit,
        )
    }

    #[test]
    fn single_verifier_rejects_signature_over_other_message() {
        let secret_key = secret_key(1);
        let signature_bytes = secret_key.sign(H256::repeat_byte(7)).to_bytes();

        let error = SingleVerifier
            .verify_singular(
                H256::repeat_byte(8),
                signature_bytes,
                &secret_key.to_public_key(),
                SignatureKind::VoluntaryExit,
            )
            .expect_err("signature is over a different message");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::SignatureInvalid(SignatureKind::VoluntaryExit)),
        ));
    }

    #[test]
    fn single_verifier_rejects_empty_signature() {
        let public_key = secret_key(1).to_public_key();

        SingleVerifier
            .verify_aggregate(
                H256::zero(),
                SignatureBytes::empty(),
                [&public_key],
                SignatureKind::Attestation,
            )
            .expect_err("the point at infinity is not a valid aggregate");
    }

    #[test]
    fn single_verifier_accepts_valid_aggregate() -> Result<()> {
        let message = H256::repeat_byte(3);
        let secret_keys = [secret_key(1), secret_key(2), secret_key(3)];
        let public_keys = secret_keys.each_ref().map(SecretKey::to_public_key);
        let signatures = secret_keys.each_ref().map(|secret_key| secret_key.sign(message));
        let aggregate = Signature::aggregate(&signatures).expect("signatures are not empty");

        SingleVerifier.verify_aggregate(
            message,
            aggregate.to_bytes(),
            &public_keys,
            SignatureKind::Attestation,
        )
    }

    #[test]
    fn null_verifier_accepts_anything() -> Result<()> {
        let mut verifier = NullVerifier;
        let public_key = secret_key(1).to_public_key();

        verifier.verify_singular(
            H256::zero(),
            SignatureBytes::zero(),
            &public_key,
            SignatureKind::VoluntaryExit,
        )?;

        verifier.verify_aggregate(
            H256::zero(),
            SignatureBytes::zero(),
            core::iter::empty(),
            SignatureKind::Attestation,
        )
    }
}
