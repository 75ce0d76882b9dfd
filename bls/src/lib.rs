//! BLS12-381 signatures in the `min_pk` configuration backed by `blst`.

pub use crate::{
    error::Error, public_key::PublicKey, public_key_bytes::PublicKeyBytes,
    secret_key::SecretKey, signature::Signature, signature_bytes::SignatureBytes,
};

mod error;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod signature;
mod signature_bytes;

/// Ciphersuite for proof-of-possession signatures with public keys in G1.
pub const DOMAIN_SEPARATION_TAG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
