//! # Sparse Merkle Proofs
//!
//! Proofs against the root of the account state tree, a sparse Merkle tree
//! keyed by 256-bit hashes. Keys are read most significant bit first: bit
//! `i` picks the child at depth `i`. A subtree holding a single leaf is
//! represented by that leaf, so proofs stop as soon as the path is unique.

use crate::domain::{AccountStateBlob, VerifyError, VerifyResult, MAX_SPARSE_MERKLE_PROOF_DEPTH};
use serde::{Deserialize, Serialize};
use shared_crypto::{CryptoHash, HashDomain, HashValue, SPARSE_MERKLE_PLACEHOLDER_HASH};

/// A leaf of the state tree: key and hash of the stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMerkleLeafNode {
    /// Leaf key.
    pub key: HashValue,
    /// Hash of the stored value.
    pub value_hash: HashValue,
}

impl SparseMerkleLeafNode {
    /// Create a leaf.
    pub fn new(key: HashValue, value_hash: HashValue) -> Self {
        Self { key, value_hash }
    }

    /// `H(SparseMerkleLeaf, key || value_hash)`.
    pub fn hash(&self) -> HashValue {
        HashDomain::SparseMerkleLeaf.hash_pair(&self.key, &self.value_hash)
    }
}

/// Hash of an internal state tree node.
pub fn sparse_merkle_internal_hash(left: &HashValue, right: &HashValue) -> HashValue {
    HashDomain::SparseMerkleInternal.hash_pair(left, right)
}

/// Inclusion or non-inclusion proof for one key.
///
/// * `leaf` equal to the key: inclusion proof, `value_hash` is the value's hash
/// * `leaf` with another key: that key is the only one in the subtree where
///   the requested key would live
/// * no `leaf`: that subtree is empty
///
/// Siblings run from the bottom of the path up to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMerkleProof {
    leaf: Option<SparseMerkleLeafNode>,
    siblings: Vec<HashValue>,
}

impl SparseMerkleProof {
    /// Create a proof.
    pub fn new(leaf: Option<SparseMerkleLeafNode>, siblings: Vec<HashValue>) -> Self {
        Self { leaf, siblings }
    }

    /// Leaf found at the end of the path, if any.
    pub fn leaf(&self) -> Option<SparseMerkleLeafNode> {
        self.leaf
    }

    /// Siblings, bottom up.
    pub fn siblings(&self) -> &[HashValue] {
        &self.siblings
    }

    /// Verify `element_blob` is stored under `element_key`, or with `None`
    /// that nothing is.
    pub fn verify(
        &self,
        expected_root_hash: HashValue,
        element_key: HashValue,
        element_blob: Option<&AccountStateBlob>,
    ) -> VerifyResult<()> {
        let value_hash = element_blob.map(|blob| blob.hash()).transpose()?;
        self.verify_by_hash(expected_root_hash, element_key, value_hash)
    }

    /// Same as [`verify`](Self::verify) with the value already hashed.
    pub fn verify_by_hash(
        &self,
        expected_root_hash: HashValue,
        element_key: HashValue,
        element_value_hash: Option<HashValue>,
    ) -> VerifyResult<()> {
        if self.siblings.len() > MAX_SPARSE_MERKLE_PROOF_DEPTH {
            return Err(VerifyError::MalformedProof(format!(
                "Sparse Merkle Tree proof has more than {} ({}) siblings",
                MAX_SPARSE_MERKLE_PROOF_DEPTH,
                self.siblings.len()
            )));
        }

        match (self.leaf, element_value_hash) {
            (Some(leaf), Some(value_hash)) => {
                // Inclusion: the proof leaf is the element itself.
                if leaf.key != element_key {
                    return Err(VerifyError::KeyMismatch {
                        proof_key: leaf.key,
                        expected: element_key,
                    });
                }
                if leaf.value_hash != value_hash {
                    return Err(VerifyError::ValueMismatch {
                        proof_value_hash: leaf.value_hash,
                        expected: value_hash,
                    });
                }
            }
            (Some(leaf), None) => {
                // Non-inclusion: inserting the element would split this leaf,
                // so the two keys must share the whole path.
                if leaf.key == element_key {
                    return Err(VerifyError::InvalidNonInclusion(
                        "Expected non-inclusion proof, but key exists in proof".to_string(),
                    ));
                }
                if element_key.common_prefix_bits_len(&leaf.key) < self.siblings.len() {
                    return Err(VerifyError::InvalidNonInclusion(format!(
                        "Key would not have ended up in the subtree where {} is the only key",
                        leaf.key
                    )));
                }
            }
            (None, Some(_)) => return Err(VerifyError::ExpectedInclusionProof),
            (None, None) => {}
        }

        let current_hash = self
            .leaf
            .map_or(SPARSE_MERKLE_PLACEHOLDER_HASH, |leaf| leaf.hash());
        let actual_root_hash = self
            .siblings
            .iter()
            .zip(element_key.iter_bits().take(self.siblings.len()).rev())
            .fold(current_hash, |hash, (sibling, bit)| {
                if bit {
                    sparse_merkle_internal_hash(sibling, &hash)
                } else {
                    sparse_merkle_internal_hash(&hash, sibling)
                }
            });

        if actual_root_hash != expected_root_hash {
            return Err(VerifyError::RootMismatch {
                actual: actual_root_hash,
                expected: expected_root_hash,
            });
        }
        Ok(())
    }
}

/// Proof that the leaves up to a known rightmost leaf are complete: the
/// caller supplies the left siblings from its own copy of the tree, the
/// proof supplies the right ones.
///
/// Siblings run from the bottom up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMerkleRangeProof {
    right_siblings: Vec<HashValue>,
}

impl SparseMerkleRangeProof {
    /// Create from bottom-up right siblings.
    pub fn new(right_siblings: Vec<HashValue>) -> Self {
        Self { right_siblings }
    }

    /// Right siblings, bottom up.
    pub fn right_siblings(&self) -> &[HashValue] {
        &self.right_siblings
    }

    /// Verify the tree rooted at `expected_root_hash` has `rightmost_known_leaf`
    /// with `left_siblings` on its left and this proof's siblings on its right.
    pub fn verify(
        &self,
        expected_root_hash: HashValue,
        rightmost_known_leaf: SparseMerkleLeafNode,
        left_siblings: &[HashValue],
    ) -> VerifyResult<()> {
        let num_siblings = left_siblings.len() + self.right_siblings.len();
        if num_siblings > MAX_SPARSE_MERKLE_PROOF_DEPTH {
            return Err(VerifyError::MalformedProof(format!(
                "Sparse Merkle range proof has more than {} ({}) siblings",
                MAX_SPARSE_MERKLE_PROOF_DEPTH, num_siblings
            )));
        }

        let mut left_sibling_iter = left_siblings.iter();
        let mut right_sibling_iter = self.right_siblings.iter();

        let mut current_hash = rightmost_known_leaf.hash();
        for bit in rightmost_known_leaf
            .key
            .iter_bits()
            .rev()
            .skip(HashValue::LENGTH_IN_BITS - num_siblings)
        {
            current_hash = if bit {
                let left_hash = left_sibling_iter.next().ok_or_else(|| {
                    VerifyError::MalformedProof("Missing left sibling".to_string())
                })?;
                sparse_merkle_internal_hash(left_hash, &current_hash)
            } else {
                let right_hash = right_sibling_iter.next().ok_or_else(|| {
                    VerifyError::MalformedProof("Missing right sibling".to_string())
                })?;
                sparse_merkle_internal_hash(&current_hash, right_hash)
            };
        }

        if left_sibling_iter.next().is_some() || right_sibling_iter.next().is_some() {
            return Err(VerifyError::MalformedProof(
                "Siblings do not match the key path".to_string(),
            ));
        }

        if current_hash != expected_root_hash {
            return Err(VerifyError::RootMismatch {
                actual: current_hash,
                expected: expected_root_hash,
            });
        }
        Ok(())
    }
}
