//! # Proof Builders
//!
//! Full trees that hold every leaf and hand out proofs: the server side of
//! the proofs verified in this crate. Light clients never need them; tests,
//! benches and fixtures do.

use super::accumulator_proof::{AccumulatorConsistencyProof, AccumulatorProof, AccumulatorRangeProof};
use super::sparse_merkle::{
    sparse_merkle_internal_hash, SparseMerkleLeafNode, SparseMerkleProof, SparseMerkleRangeProof,
};
use crate::domain::{
    AccumulatorHasher, FrozenSubtreeSiblingIterator, InMemoryAccumulator, Position, VerifyError,
    VerifyResult,
};
use shared_crypto::{HashValue, ACCUMULATOR_PLACEHOLDER_HASH, SPARSE_MERKLE_PLACEHOLDER_HASH};
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Accumulator holding every leaf, with every level materialized.
///
/// Level `l` holds `ceil(n / 2^l)` nodes; a missing right neighbour is the
/// placeholder hash.
#[derive(Clone, Debug)]
pub struct MerkleAccumulator<H: AccumulatorHasher> {
    levels: Vec<Vec<HashValue>>,
    phantom: PhantomData<H>,
}

impl<H: AccumulatorHasher> MerkleAccumulator<H> {
    /// Build from all leaves.
    pub fn new(leaves: Vec<HashValue>) -> Self {
        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let parents = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => H::hash_internal(left, right),
                    [left] => H::hash_internal(left, &ACCUMULATOR_PLACEHOLDER_HASH),
                    _ => ACCUMULATOR_PLACEHOLDER_HASH,
                })
                .collect();
            levels.push(parents);
        }
        Self {
            levels,
            phantom: PhantomData,
        }
    }

    /// Rebuild with more leaves.
    pub fn append(&mut self, leaves: &[HashValue]) {
        let mut all = self.leaves().to_vec();
        all.extend_from_slice(leaves);
        *self = Self::new(all);
    }

    /// All leaves.
    pub fn leaves(&self) -> &[HashValue] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> u64 {
        self.leaves().len() as u64
    }

    /// Root hash; the placeholder when empty.
    pub fn root_hash(&self) -> HashValue {
        match self.levels.last() {
            Some(top) if top.len() == 1 => top[0],
            _ => ACCUMULATOR_PLACEHOLDER_HASH,
        }
    }

    /// Hash of the node at `position`.
    pub fn node_hash(&self, position: Position) -> HashValue {
        self.levels
            .get(position.level() as usize)
            .and_then(|level| level.get(position.pos_counting_from_left() as usize))
            .copied()
            .unwrap_or(ACCUMULATOR_PLACEHOLDER_HASH)
    }

    /// Frozen-subtree summary of this accumulator.
    pub fn to_in_memory(&self) -> InMemoryAccumulator<H> {
        InMemoryAccumulator::from_leaves(self.leaves())
    }

    fn root_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    fn check_leaf_index(&self, leaf_index: u64) -> VerifyResult<()> {
        if leaf_index >= self.num_leaves() {
            return Err(VerifyError::InvalidInput(format!(
                "leaf index {} out of range, accumulator has {} leaves",
                leaf_index,
                self.num_leaves()
            )));
        }
        Ok(())
    }

    /// Sibling of the `index`-th node at `level`.
    fn sibling_at(&self, level: usize, index: u64) -> HashValue {
        self.levels[level]
            .get((index ^ 1) as usize)
            .copied()
            .unwrap_or(ACCUMULATOR_PLACEHOLDER_HASH)
    }

    /// Inclusion proof for one leaf.
    pub fn get_proof(&self, leaf_index: u64) -> VerifyResult<AccumulatorProof<H>> {
        self.check_leaf_index(leaf_index)?;
        let siblings = (0..self.root_level())
            .map(|level| self.sibling_at(level, leaf_index >> level))
            .collect();
        Ok(AccumulatorProof::new(siblings))
    }

    /// Range proof for `num_leaves` leaves starting at `first_leaf_index`.
    pub fn get_range_proof(
        &self,
        first_leaf_index: Option<u64>,
        num_leaves: u64,
    ) -> VerifyResult<AccumulatorRangeProof<H>> {
        let first_leaf_index = match first_leaf_index {
            None if num_leaves == 0 => return Ok(AccumulatorRangeProof::new_empty()),
            Some(index) if num_leaves > 0 => index,
            _ => {
                return Err(VerifyError::InvalidInput(
                    "a range starts at some leaf exactly when it is non-empty".to_string(),
                ))
            }
        };
        let last_leaf_index = first_leaf_index
            .checked_add(num_leaves - 1)
            .ok_or_else(|| VerifyError::InvalidInput("range overflows".to_string()))?;
        self.check_leaf_index(last_leaf_index)?;

        let mut left_siblings = Vec::new();
        let mut right_siblings = Vec::new();
        for level in 0..self.root_level() {
            let first = first_leaf_index >> level;
            if first & 1 == 1 {
                left_siblings.push(self.sibling_at(level, first));
            }
            let last = last_leaf_index >> level;
            if last & 1 == 0 {
                right_siblings.push(self.sibling_at(level, last));
            }
        }
        left_siblings.reverse();
        right_siblings.reverse();
        Ok(AccumulatorRangeProof::new(left_siblings, right_siblings))
    }

    /// Subtrees that grow an accumulator of `old_num_leaves` into this one.
    pub fn get_consistency_proof(&self, old_num_leaves: u64) -> VerifyResult<AccumulatorConsistencyProof<H>> {
        let subtrees = FrozenSubtreeSiblingIterator::new(old_num_leaves, self.num_leaves())?
            .map(|position| self.node_hash(position))
            .collect();
        Ok(AccumulatorConsistencyProof::new(subtrees))
    }
}

/// Sparse Merkle tree holding every leaf.
#[derive(Clone, Debug, Default)]
pub struct SparseMerkleTree {
    leaves: BTreeMap<HashValue, HashValue>,
}

impl SparseMerkleTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value hash stored under `key`.
    pub fn insert(&mut self, key: HashValue, value_hash: HashValue) {
        self.leaves.insert(key, value_hash);
    }

    /// Remove `key`.
    pub fn remove(&mut self, key: &HashValue) {
        self.leaves.remove(key);
    }

    /// Value hash stored under `key`.
    pub fn get(&self, key: &HashValue) -> Option<HashValue> {
        self.leaves.get(key).copied()
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    fn entries(&self) -> Vec<SparseMerkleLeafNode> {
        self.leaves
            .iter()
            .map(|(key, value_hash)| SparseMerkleLeafNode::new(*key, *value_hash))
            .collect()
    }

    /// Root hash; the placeholder when empty.
    pub fn root_hash(&self) -> HashValue {
        subtree_hash(&self.entries(), 0)
    }

    /// Inclusion proof when `key` is present, non-inclusion proof otherwise.
    pub fn get_proof(&self, key: &HashValue) -> SparseMerkleProof {
        let entries = self.entries();
        let mut subtree = entries.as_slice();
        let mut siblings = Vec::new();
        let mut depth = 0;

        let leaf = loop {
            match subtree {
                [] => break None,
                [leaf] => break Some(*leaf),
                _ => {}
            }
            let (left, right) = split_at_bit(subtree, depth);
            if key.bit(depth) {
                siblings.push(subtree_hash(left, depth + 1));
                subtree = right;
            } else {
                siblings.push(subtree_hash(right, depth + 1));
                subtree = left;
            }
            depth += 1;
        };

        siblings.reverse();
        SparseMerkleProof::new(leaf, siblings)
    }

    /// Range proof with `key` as the rightmost known leaf, together with the
    /// left siblings the verifier is expected to know.
    pub fn get_range_proof(&self, key: &HashValue) -> VerifyResult<(SparseMerkleRangeProof, Vec<HashValue>)> {
        let entries = self.entries();
        let mut subtree = entries.as_slice();
        let mut left_siblings = Vec::new();
        let mut right_siblings = Vec::new();
        let mut depth = 0;

        loop {
            match subtree {
                [leaf] if leaf.key == *key => break,
                [] | [_] => {
                    return Err(VerifyError::InvalidInput(format!("key {} is not in the tree", key)))
                }
                _ => {}
            }
            let (left, right) = split_at_bit(subtree, depth);
            if key.bit(depth) {
                left_siblings.push(subtree_hash(left, depth + 1));
                subtree = right;
            } else {
                right_siblings.push(subtree_hash(right, depth + 1));
                subtree = left;
            }
            depth += 1;
        }

        left_siblings.reverse();
        right_siblings.reverse();
        Ok((SparseMerkleRangeProof::new(right_siblings), left_siblings))
    }
}

/// Split sorted leaves by the key bit at `depth`.
fn split_at_bit(leaves: &[SparseMerkleLeafNode], depth: usize) -> (&[SparseMerkleLeafNode], &[SparseMerkleLeafNode]) {
    let mid = leaves.partition_point(|leaf| !leaf.key.bit(depth));
    leaves.split_at(mid)
}

/// Hash of the subtree at `depth` holding exactly `leaves` (sorted).
fn subtree_hash(leaves: &[SparseMerkleLeafNode], depth: usize) -> HashValue {
    match leaves {
        [] => SPARSE_MERKLE_PLACEHOLDER_HASH,
        [leaf] => leaf.hash(),
        _ => {
            let (left, right) = split_at_bit(leaves, depth);
            sparse_merkle_internal_hash(&subtree_hash(left, depth + 1), &subtree_hash(right, depth + 1))
        }
    }
}
