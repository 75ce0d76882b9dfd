//! SHA-256 helpers and a minimal binary merkleizer.
//!
//! Only fixed-size containers made of 32-byte chunks need roots here,
//! so there is no support for lists or mixed-in lengths.

use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let digest = Sha256::new()
        .chain_update(left.as_bytes())
        .chain_update(right.as_bytes())
        .finalize();

    H256::from_slice(digest.as_slice())
}

/// Packs a `u64` into a chunk the way basic values are laid out in a container.
#[inline]
#[must_use]
pub fn uint_chunk(value: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk.as_bytes_mut()[..size_of::<u64>()].copy_from_slice(&value.to_le_bytes());
    chunk
}

/// Packs up to 32 bytes into a chunk, padding the rest with zeros.
#[inline]
#[must_use]
pub fn bytes_chunk(bytes: &[u8]) -> H256 {
    let mut chunk = H256::zero();
    chunk.as_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
    chunk
}

/// Merkleizes `chunks`, padding the leaf layer with zero chunks up to the next power of two.
#[must_use]
pub fn merkleize(chunks: &[H256]) -> H256 {
    let mut layer = chunks.to_vec();
    let mut zero_subtree = H256::zero();

    if layer.is_empty() {
        return zero_subtree;
    }

    while layer.len() > 1 {
        if layer.len() % 2 == 1 {
            layer.push(zero_subtree);
        }

        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_256_256(pair[0], pair[1]))
            .collect();

        zero_subtree = hash_256_256(zero_subtree, zero_subtree);
    }

    layer[0]
}
