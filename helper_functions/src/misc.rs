use anyhow::Result;
use itertools::{EitherOrBoth, Itertools as _};
use types::{
    config::Config,
    phase0::{
        containers::{ForkData, SigningData},
        primitives::{Domain, DomainType, Epoch, Slot, Version, H256},
    },
    traits::HashTreeRoot,
};

use crate::error::Error;

#[must_use]
pub fn compute_epoch_at_slot(config: &Config, slot: Slot) -> Epoch {
    slot / config.slots_per_epoch
}

#[must_use]
pub const fn compute_start_slot_at_epoch(config: &Config, epoch: Epoch) -> Slot {
    epoch.saturating_mul(config.slots_per_epoch.get())
}

/// Epoch at which an activation or exit initiated in `epoch` takes effect.
pub fn compute_activation_exit_epoch(config: &Config, epoch: Epoch) -> Result<Epoch> {
    epoch
        .checked_add(1)
        .and_then(|next| next.checked_add(config.max_seed_lookahead))
        .ok_or_else(|| Error::EpochOverflow.into())
}

fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> Domain {
    let fork_version = fork_version.unwrap_or(config.genesis_fork_version);
    let genesis_validators_root = genesis_validators_root.unwrap_or_else(H256::zero);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

#[must_use]
pub fn compute_signing_root(object: &(impl HashTreeRoot + ?Sized), domain: Domain) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

/// Intersects two strictly increasing sequences in a single parallel pass.
///
/// Each common element is yielded once, in increasing order.
/// The result is unspecified if either input is not strictly increasing.
pub fn intersect_sorted<T: Ord>(
    left: impl IntoIterator<Item = T>,
    right: impl IntoIterator<Item = T>,
) -> impl Iterator<Item = T> {
    left.into_iter()
        .merge_join_by(right, Ord::cmp)
        .filter_map(|either_or_both| match either_or_both {
            EitherOrBoth::Both(element, _) => Some(element),
            EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => None,
        })
}
