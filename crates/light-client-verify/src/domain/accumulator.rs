//! # In-Memory Accumulator
//!
//! A Merkle accumulator kept as the list of its frozen subtree roots: enough
//! to compute the root hash and to keep appending, without storing any leaf.
//!
//! Internal nodes are `H(domain, left || right)` where the domain depends on
//! which accumulator the tree belongs to (transactions, events, tests). Empty
//! right subtrees are the accumulator placeholder hash.

use super::errors::{VerifyError, VerifyResult};
use super::invariants::{invariant_accumulator_capacity, invariant_frozen_subtrees};
use shared_crypto::{HashDomain, HashValue, ACCUMULATOR_PLACEHOLDER_HASH};
use std::fmt;
use std::marker::PhantomData;

/// Picks the hash domain of an accumulator's internal nodes.
pub trait AccumulatorHasher:
    Clone + Copy + fmt::Debug + Default + PartialEq + Eq + Send + Sync + 'static
{
    /// Domain of internal nodes.
    const DOMAIN: HashDomain;

    /// Hash of an internal node.
    fn hash_internal(left: &HashValue, right: &HashValue) -> HashValue {
        Self::DOMAIN.hash_pair(left, right)
    }
}

/// Transaction accumulator (leaves are transaction info hashes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionAccumulatorHasher;

impl AccumulatorHasher for TransactionAccumulatorHasher {
    const DOMAIN: HashDomain = HashDomain::TransactionAccumulator;
}

/// Per-transaction event accumulator (leaves are event hashes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventAccumulatorHasher;

impl AccumulatorHasher for EventAccumulatorHasher {
    const DOMAIN: HashDomain = HashDomain::EventAccumulator;
}

/// Accumulator used only by tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestOnlyHasher;

#[cfg(any(test, feature = "test-utils"))]
impl AccumulatorHasher for TestOnlyHasher {
    const DOMAIN: HashDomain = HashDomain::TestOnly;
}

/// Accumulator summarized by its frozen subtree roots.
#[derive(Clone, PartialEq, Eq)]
pub struct InMemoryAccumulator<H: AccumulatorHasher> {
    /// Roots of the perfect subtrees, left to right.
    frozen_subtree_roots: Vec<HashValue>,
    /// Total number of leaves.
    num_leaves: u64,
    /// Root hash of the whole tree.
    root_hash: HashValue,
    phantom: PhantomData<H>,
}

impl<H: AccumulatorHasher> InMemoryAccumulator<H> {
    /// Rebuild from frozen subtree roots; needs one root per set bit of `num_leaves`.
    pub fn new(frozen_subtree_roots: Vec<HashValue>, num_leaves: u64) -> VerifyResult<Self> {
        invariant_frozen_subtrees(frozen_subtree_roots.len(), num_leaves)?;
        Ok(Self::from_parts(frozen_subtree_roots, num_leaves))
    }

    /// Empty accumulator.
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), 0)
    }

    /// Accumulator holding exactly `leaves`.
    pub fn from_leaves(leaves: &[HashValue]) -> Self {
        Self::empty().append(leaves)
    }

    fn from_parts(frozen_subtree_roots: Vec<HashValue>, num_leaves: u64) -> Self {
        let root_hash = Self::compute_root_hash(&frozen_subtree_roots, num_leaves);
        Self {
            frozen_subtree_roots,
            num_leaves,
            root_hash,
            phantom: PhantomData,
        }
    }

    /// New accumulator with `leaves` appended.
    pub fn append(&self, leaves: &[HashValue]) -> Self {
        let mut frozen_subtree_roots = self.frozen_subtree_roots.clone();
        let mut num_leaves = self.num_leaves;
        for leaf in leaves {
            Self::append_one(&mut frozen_subtree_roots, num_leaves, *leaf);
            num_leaves += 1;
        }
        Self::from_parts(frozen_subtree_roots, num_leaves)
    }

    /// Push one leaf, then merge as many times as the old count had trailing ones.
    fn append_one(
        frozen_subtree_roots: &mut Vec<HashValue>,
        num_existing_leaves: u64,
        leaf: HashValue,
    ) {
        frozen_subtree_roots.push(leaf);
        for _ in 0..num_existing_leaves.trailing_ones() {
            let (Some(right), Some(left)) = (frozen_subtree_roots.pop(), frozen_subtree_roots.pop())
            else {
                break;
            };
            frozen_subtree_roots.push(H::hash_internal(&left, &right));
        }
    }

    /// New accumulator with whole subtrees appended.
    ///
    /// `subtrees` are the roots named by
    /// [`FrozenSubtreeSiblingIterator`](super::position::FrozenSubtreeSiblingIterator)
    /// for growing this accumulator by `num_new_leaves`.
    pub fn append_subtrees(&self, subtrees: &[HashValue], num_new_leaves: u64) -> VerifyResult<Self> {
        invariant_accumulator_capacity(self.num_leaves, num_new_leaves)?;

        if self.num_leaves == 0 {
            return Self::new(subtrees.to_vec(), num_new_leaves);
        }

        let mut current_subtree_roots = self.frozen_subtree_roots.clone();
        let mut current_num_leaves = self.num_leaves;
        let mut remaining_new_leaves = num_new_leaves;
        let mut subtree_iter = subtrees.iter();

        // Merge new subtrees into the rightmost frozen one while they pair up.
        let mut rightmost_frozen_subtree_size = 1u64 << current_num_leaves.trailing_zeros();
        while rightmost_frozen_subtree_size != 0 && remaining_new_leaves >= rightmost_frozen_subtree_size {
            let mut current_hash = *subtree_iter.next().ok_or_else(|| {
                VerifyError::InvalidInput("Too few subtrees for the new leaf count".to_string())
            })?;
            let mut mask = rightmost_frozen_subtree_size;
            while current_num_leaves & mask != 0 {
                let left_hash = current_subtree_roots.pop().ok_or_else(|| {
                    VerifyError::InvalidInput("Frozen subtree roots exhausted".to_string())
                })?;
                current_hash = H::hash_internal(&left_hash, &current_hash);
                mask <<= 1;
            }
            current_subtree_roots.push(current_hash);

            current_num_leaves += rightmost_frozen_subtree_size;
            remaining_new_leaves -= rightmost_frozen_subtree_size;
            rightmost_frozen_subtree_size = mask;
        }

        // Whatever is left is smaller than the rightmost frozen subtree.
        current_num_leaves += remaining_new_leaves;
        current_subtree_roots.extend(subtree_iter.copied());

        Self::new(current_subtree_roots, current_num_leaves)
    }

    /// Root hash from frozen subtree roots.
    ///
    /// Walks the roots right to left against the bits of the leaf count,
    /// starting from a placeholder. A set bit puts the next frozen root on
    /// the left; a clear bit pads the right with a placeholder.
    pub fn compute_root_hash(frozen_subtree_roots: &[HashValue], num_leaves: u64) -> HashValue {
        match frozen_subtree_roots {
            [] => return ACCUMULATOR_PLACEHOLDER_HASH,
            [root] => return *root,
            _ => {}
        }

        // Trailing zeros are already folded into the lowest frozen root.
        let mut bitmap = num_leaves >> num_leaves.trailing_zeros();
        let mut roots = frozen_subtree_roots.iter().rev();
        let mut current_hash = ACCUMULATOR_PLACEHOLDER_HASH;

        while bitmap > 0 {
            current_hash = if bitmap & 1 != 0 {
                match roots.next() {
                    Some(left) => H::hash_internal(left, &current_hash),
                    None => break,
                }
            } else {
                H::hash_internal(&current_hash, &ACCUMULATOR_PLACEHOLDER_HASH)
            };
            bitmap >>= 1;
        }

        current_hash
    }

    /// Frozen subtree roots, left to right.
    pub fn frozen_subtree_roots(&self) -> &[HashValue] {
        &self.frozen_subtree_roots
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }

    /// Root hash.
    pub fn root_hash(&self) -> HashValue {
        self.root_hash
    }

    /// Version of the last leaf; 0 when empty.
    pub fn version(&self) -> u64 {
        self.num_leaves.saturating_sub(1)
    }
}

impl<H: AccumulatorHasher> Default for InMemoryAccumulator<H> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<H: AccumulatorHasher> fmt::Debug for InMemoryAccumulator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryAccumulator")
            .field("domain", &H::DOMAIN)
            .field("num_leaves", &self.num_leaves)
            .field("root_hash", &self.root_hash)
            .finish()
    }
}
