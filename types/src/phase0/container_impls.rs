use hashing::{bytes_chunk, merkleize, uint_chunk};

use crate::{
    phase0::{
        containers::{
            AttestationData, BeaconBlockHeader, Checkpoint, ForkData, SigningData, VoluntaryExit,
        },
        primitives::H256,
    },
    traits::HashTreeRoot,
};

impl HashTreeRoot for AttestationData {
    fn hash_tree_root(&self) -> H256 {
        merkleize(&[
            uint_chunk(self.slot),
            uint_chunk(self.index),
            self.beacon_block_root,
            self.source.hash_tree_root(),
            self.target.hash_tree_root(),
        ])
    }
}

impl HashTreeRoot for BeaconBlockHeader {
    fn hash_tree_root(&self) -> H256 {
        merkleize(&[
            uint_chunk(self.slot),
            uint_chunk(self.proposer_index),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }
}

impl HashTreeRoot for Checkpoint {
    fn hash_tree_root(&self) -> H256 {
        merkleize(&[uint_chunk(self.epoch), self.root])
    }
}

impl HashTreeRoot for ForkData {
    fn hash_tree_root(&self) -> H256 {
        merkleize(&[
            bytes_chunk(self.current_version.as_bytes()),
            self.genesis_validators_root,
        ])
    }
}

impl HashTreeRoot for SigningData {
    fn hash_tree_root(&self) -> H256 {
        merkleize(&[self.object_root, self.domain])
    }
}

impl HashTreeRoot for VoluntaryExit {
    fn hash_tree_root(&self) -> H256 {
        merkleize(&[uint_chunk(self.epoch), uint_chunk(self.validator_index)])
    }
}
