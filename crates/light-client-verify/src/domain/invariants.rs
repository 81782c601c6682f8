//! # Domain Invariants
//!
//! Limits and rules that must hold for any proof or response to be accepted.

use super::errors::{VerifyError, VerifyResult};
use super::value_objects::Version;

/// Maximum number of siblings in an accumulator proof (tree height bound).
pub const MAX_ACCUMULATOR_PROOF_DEPTH: usize = 63;

/// Maximum number of leaves an accumulator can hold.
pub const MAX_ACCUMULATOR_LEAVES: u64 = 1 << MAX_ACCUMULATOR_PROOF_DEPTH;

/// Maximum number of siblings in a sparse Merkle proof (key length in bits).
pub const MAX_SPARSE_MERKLE_PROOF_DEPTH: usize = 256;

/// Signature sets at least this large are verified on the rayon pool.
pub const PARALLEL_SIGNATURE_THRESHOLD: usize = 16;

/// Default bound on ledger infos accepted in one epoch change proof.
pub const DEFAULT_MAX_EPOCH_CHANGE_PROOF_LEN: usize = 100;

/// Invariant: a proven version never lies beyond the trusted ledger info.
pub fn invariant_version_not_newer(version: Version, ledger_version: Version) -> VerifyResult<()> {
    if version > ledger_version {
        return Err(VerifyError::VersionTooNew {
            version,
            ledger_version,
        });
    }
    Ok(())
}

/// Invariant: a server never moves the client backwards.
pub fn invariant_fresh_response(
    ledger_version: Version,
    client_known_version: Version,
) -> VerifyResult<()> {
    if ledger_version < client_known_version {
        return Err(VerifyError::StaleResponse {
            ledger_version,
            client_known_version,
        });
    }
    Ok(())
}

/// Invariant: an accumulator holds one frozen subtree root per set bit of
/// its leaf count.
pub fn invariant_frozen_subtrees(num_roots: usize, num_leaves: u64) -> VerifyResult<()> {
    if num_leaves > MAX_ACCUMULATOR_LEAVES {
        return Err(VerifyError::InvalidInput(format!(
            "{} leaves exceeds the accumulator capacity",
            num_leaves
        )));
    }
    if num_roots != num_leaves.count_ones() as usize {
        return Err(VerifyError::InvalidInput(format!(
            "{} leaves need {} frozen subtree roots, got {}",
            num_leaves,
            num_leaves.count_ones(),
            num_roots
        )));
    }
    Ok(())
}

/// Invariant: appending `num_new_leaves` keeps the accumulator within capacity.
pub fn invariant_accumulator_capacity(num_leaves: u64, num_new_leaves: u64) -> VerifyResult<()> {
    if num_new_leaves > MAX_ACCUMULATOR_LEAVES.saturating_sub(num_leaves) {
        return Err(VerifyError::TooManyLeaves {
            num_leaves,
            num_new_leaves,
        });
    }
    Ok(())
}

/// Invariant: two lengths in a proof agree.
pub fn invariant_same_length(what: &str, left: usize, right: usize) -> VerifyResult<()> {
    if left != right {
        return Err(VerifyError::MalformedProof(format!(
            "{} length mismatch: {} vs {}",
            what, left, right
        )));
    }
    Ok(())
}
