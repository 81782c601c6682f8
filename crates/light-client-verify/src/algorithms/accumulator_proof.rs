//! # Accumulator Proofs
//!
//! Proofs against the root of a Merkle accumulator:
//!
//! | Proof | Shows |
//! |-------|-------|
//! | [`AccumulatorProof`] | one leaf sits at a given index |
//! | [`AccumulatorRangeProof`] | a run of consecutive leaves starts at a given index |
//! | [`AccumulatorConsistencyProof`] | a larger accumulator extends a known smaller one |

use crate::domain::{
    AccumulatorHasher, EventAccumulatorHasher, FrozenSubtreeSiblingIterator, InMemoryAccumulator,
    Position, TransactionAccumulatorHasher, VerifyError, VerifyResult,
    MAX_ACCUMULATOR_LEAVES, MAX_ACCUMULATOR_PROOF_DEPTH,
};
use serde::{Deserialize, Serialize};
use shared_crypto::HashValue;
use std::marker::PhantomData;

/// Inclusion proof for one accumulator leaf.
///
/// Siblings run from the leaf level up to just below the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AccumulatorProof<H: AccumulatorHasher> {
    siblings: Vec<HashValue>,
    #[serde(skip)]
    phantom: PhantomData<H>,
}

/// Proof of a transaction info in the transaction accumulator.
pub type TransactionAccumulatorProof = AccumulatorProof<TransactionAccumulatorHasher>;
/// Proof of an event in a transaction's event accumulator.
pub type EventAccumulatorProof = AccumulatorProof<EventAccumulatorHasher>;
/// Proof in a test accumulator.
#[cfg(any(test, feature = "test-utils"))]
pub type TestAccumulatorProof = AccumulatorProof<crate::domain::TestOnlyHasher>;

impl<H: AccumulatorHasher> AccumulatorProof<H> {
    /// Create a proof from bottom-up siblings.
    pub fn new(siblings: Vec<HashValue>) -> Self {
        Self {
            siblings,
            phantom: PhantomData,
        }
    }

    /// Siblings, bottom up.
    pub fn siblings(&self) -> &[HashValue] {
        &self.siblings
    }

    /// Verify that `element_hash` is leaf `element_index` of the accumulator
    /// with root `expected_root_hash`.
    ///
    /// # Algorithm
    ///
    /// 1. Start from the element hash and its index
    /// 2. For each sibling: an even index puts the sibling on the right,
    ///    an odd one on the left; halve the index
    /// 3. The result must equal the expected root
    ///
    /// # Time Complexity: O(log n)
    pub fn verify(
        &self,
        expected_root_hash: HashValue,
        element_hash: HashValue,
        element_index: u64,
    ) -> VerifyResult<()> {
        if self.siblings.len() > MAX_ACCUMULATOR_PROOF_DEPTH {
            return Err(VerifyError::ProofTooDeep {
                depth: self.siblings.len(),
                max: MAX_ACCUMULATOR_PROOF_DEPTH,
            });
        }

        let (actual_root_hash, _) = self.siblings.iter().fold(
            (element_hash, element_index),
            |(hash, index), sibling| {
                let parent = if index & 1 == 0 {
                    H::hash_internal(&hash, sibling)
                } else {
                    H::hash_internal(sibling, &hash)
                };
                (parent, index >> 1)
            },
        );

        if actual_root_hash != expected_root_hash {
            return Err(VerifyError::RootMismatch {
                actual: actual_root_hash,
                expected: expected_root_hash,
            });
        }
        Ok(())
    }
}

/// Proof that consecutive leaves start at a given index.
///
/// `left_siblings` are the left neighbours of the path from the first leaf
/// to the root, `right_siblings` the right neighbours of the path from the
/// last leaf. In both vectors the siblings nearest the root come first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AccumulatorRangeProof<H: AccumulatorHasher> {
    left_siblings: Vec<HashValue>,
    right_siblings: Vec<HashValue>,
    #[serde(skip)]
    phantom: PhantomData<H>,
}

/// Range proof over the transaction accumulator.
pub type TransactionAccumulatorRangeProof = AccumulatorRangeProof<TransactionAccumulatorHasher>;
/// Range proof over a test accumulator.
#[cfg(any(test, feature = "test-utils"))]
pub type TestAccumulatorRangeProof = AccumulatorRangeProof<crate::domain::TestOnlyHasher>;

impl<H: AccumulatorHasher> AccumulatorRangeProof<H> {
    /// Create a range proof from root-first sibling lists.
    pub fn new(left_siblings: Vec<HashValue>, right_siblings: Vec<HashValue>) -> Self {
        Self {
            left_siblings,
            right_siblings,
            phantom: PhantomData,
        }
    }

    /// Proof of an empty range.
    pub fn new_empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Left siblings, root first.
    pub fn left_siblings(&self) -> &[HashValue] {
        &self.left_siblings
    }

    /// Right siblings, root first.
    pub fn right_siblings(&self) -> &[HashValue] {
        &self.right_siblings
    }

    /// Verify that `leaf_hashes` are consecutive leaves starting at
    /// `first_leaf_index` of the accumulator with root `expected_root_hash`.
    ///
    /// `None` means the range is empty, in which case the proof must be too.
    ///
    /// # Algorithm
    ///
    /// Reduce one level per round until a single hash remains and every
    /// sibling is used:
    /// 1. If the first position is a right child, pair it with the next left sibling
    /// 2. Hash the rest in pairs
    /// 3. An unpaired last hash takes the next right sibling
    pub fn verify(
        &self,
        expected_root_hash: HashValue,
        first_leaf_index: Option<u64>,
        leaf_hashes: &[HashValue],
    ) -> VerifyResult<()> {
        let first_leaf_index = match first_leaf_index {
            Some(index) => index,
            None => {
                if !leaf_hashes.is_empty() {
                    return Err(VerifyError::MalformedProof(
                        "first_leaf_index is None but leaf_hashes is not empty".to_string(),
                    ));
                }
                if !self.left_siblings.is_empty() || !self.right_siblings.is_empty() {
                    return Err(VerifyError::MalformedProof(
                        "empty range proof carries siblings".to_string(),
                    ));
                }
                return Ok(());
            }
        };

        for siblings in [&self.left_siblings, &self.right_siblings] {
            if siblings.len() > MAX_ACCUMULATOR_PROOF_DEPTH {
                return Err(VerifyError::ProofTooDeep {
                    depth: siblings.len(),
                    max: MAX_ACCUMULATOR_PROOF_DEPTH,
                });
            }
        }
        if leaf_hashes.is_empty() {
            return Err(VerifyError::MalformedProof(
                "leaf_hashes is empty while first_leaf_index is set".to_string(),
            ));
        }
        let range_end = (leaf_hashes.len() as u64)
            .checked_add(first_leaf_index)
            .filter(|end| *end <= MAX_ACCUMULATOR_LEAVES);
        if range_end.is_none() {
            return Err(VerifyError::MalformedProof(format!(
                "{} leaves starting at {} exceed the accumulator capacity",
                leaf_hashes.len(),
                first_leaf_index
            )));
        }

        let mut left_sibling_iter = self.left_siblings.iter().rev().peekable();
        let mut right_sibling_iter = self.right_siblings.iter().rev().peekable();

        let mut first_pos = Position::from_leaf_index(first_leaf_index);
        let mut current_hashes = leaf_hashes.to_vec();
        let mut parent_hashes = Vec::with_capacity(current_hashes.len() / 2 + 2);

        while current_hashes.len() > 1
            || left_sibling_iter.peek().is_some()
            || right_sibling_iter.peek().is_some()
        {
            if first_pos.level() as usize >= MAX_ACCUMULATOR_PROOF_DEPTH || !first_pos.is_navigable() {
                return Err(VerifyError::MalformedProof(
                    "range proof climbs past the accumulator root".to_string(),
                ));
            }

            let mut children = current_hashes.as_slice();
            if first_pos.is_right_child() {
                let left_hash = left_sibling_iter.next().ok_or_else(|| {
                    VerifyError::MalformedProof("Missing left sibling".to_string())
                })?;
                if let Some((right_hash, rest)) = children.split_first() {
                    parent_hashes.push(H::hash_internal(left_hash, right_hash));
                    children = rest;
                }
            }

            let mut pairs = children.chunks_exact(2);
            for pair in pairs.by_ref() {
                parent_hashes.push(H::hash_internal(&pair[0], &pair[1]));
            }
            if let [left_hash] = pairs.remainder() {
                let right_hash = right_sibling_iter.next().ok_or_else(|| {
                    VerifyError::MalformedProof("Missing right sibling".to_string())
                })?;
                parent_hashes.push(H::hash_internal(left_hash, right_hash));
            }

            first_pos = first_pos.parent();
            current_hashes.clear();
            std::mem::swap(&mut current_hashes, &mut parent_hashes);
        }

        let actual_root_hash = current_hashes[0];
        if actual_root_hash != expected_root_hash {
            return Err(VerifyError::RootMismatch {
                actual: actual_root_hash,
                expected: expected_root_hash,
            });
        }
        Ok(())
    }
}

/// Proof that an accumulator of `new_num_leaves` leaves extends a known
/// smaller one: the roots of the subtrees appended to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AccumulatorConsistencyProof<H: AccumulatorHasher> {
    subtrees: Vec<HashValue>,
    #[serde(skip)]
    phantom: PhantomData<H>,
}

/// Consistency proof over the transaction accumulator.
pub type TransactionAccumulatorConsistencyProof =
    AccumulatorConsistencyProof<TransactionAccumulatorHasher>;

impl<H: AccumulatorHasher> AccumulatorConsistencyProof<H> {
    /// Create from subtree roots, left to right.
    pub fn new(subtrees: Vec<HashValue>) -> Self {
        Self {
            subtrees,
            phantom: PhantomData,
        }
    }

    /// Appended subtree roots, left to right.
    pub fn subtrees(&self) -> &[HashValue] {
        &self.subtrees
    }

    /// Grow `old` to `new_num_leaves` with the proof's subtrees and require
    /// the result to have root `expected_new_root`. Returns the grown
    /// accumulator.
    pub fn verify(
        &self,
        old: &InMemoryAccumulator<H>,
        new_num_leaves: u64,
        expected_new_root: HashValue,
    ) -> VerifyResult<InMemoryAccumulator<H>> {
        let expected_subtrees =
            FrozenSubtreeSiblingIterator::new(old.num_leaves(), new_num_leaves)?.count();
        if self.subtrees.len() != expected_subtrees {
            return Err(VerifyError::MalformedProof(format!(
                "growing {} leaves to {} needs {} subtrees, got {}",
                old.num_leaves(),
                new_num_leaves,
                expected_subtrees,
                self.subtrees.len()
            )));
        }

        let grown = old.append_subtrees(&self.subtrees, new_num_leaves - old.num_leaves())?;
        if grown.root_hash() != expected_new_root {
            return Err(VerifyError::RootMismatch {
                actual: grown.root_hash(),
                expected: expected_new_root,
            });
        }
        Ok(grown)
    }
}
