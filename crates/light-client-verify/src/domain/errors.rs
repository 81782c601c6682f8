//! # Domain Errors
//!
//! Every way a proof, a signature set, or a server response can be rejected.
//! Variants are grouped by the check that raises them so callers can tell
//! a malformed proof from a well-formed proof for the wrong root.

use super::value_objects::AccountAddress;
use shared_crypto::{CryptoError, HashValue};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Verification error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Proof shape is wrong (missing sibling, leftover sibling, bad lengths).
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Accumulator proof carries more siblings than any tree can have.
    #[error("Accumulator proof has {depth} siblings, more than the maximum {max}")]
    ProofTooDeep {
        /// Siblings in the proof
        depth: usize,
        /// Maximum allowed siblings
        max: usize,
    },

    /// Root reconstructed from the proof differs from the trusted root.
    #[error("Root hashes do not match. Actual root hash: {actual}. Expected root hash: {expected}")]
    RootMismatch {
        /// Root computed from the proof
        actual: HashValue,
        /// Root the caller trusts
        expected: HashValue,
    },

    /// Inclusion proof is for a different key.
    #[error("Keys do not match. Key in proof: {proof_key}. Expected key: {expected}")]
    KeyMismatch {
        /// Key carried by the proof leaf
        proof_key: HashValue,
        /// Key being proven
        expected: HashValue,
    },

    /// Inclusion proof is for a different value.
    #[error("Value hashes do not match. Value hash in proof: {proof_value_hash}. Expected value hash: {expected}")]
    ValueMismatch {
        /// Value hash carried by the proof leaf
        proof_value_hash: HashValue,
        /// Hash of the value being proven
        expected: HashValue,
    },

    /// A value was claimed but the proof shows an empty slot.
    #[error("Expected inclusion proof. Found non-inclusion proof.")]
    ExpectedInclusionProof,

    /// Non-inclusion proof does not actually show absence.
    #[error("Invalid non-inclusion proof: {0}")]
    InvalidNonInclusion(String),

    /// Caller-supplied argument is inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Appending would exceed the accumulator capacity.
    #[error("Too many leaves: {num_leaves} existing plus {num_new_leaves} new exceeds the accumulator capacity")]
    TooManyLeaves {
        /// Leaves already in the accumulator
        num_leaves: u64,
        /// Leaves being appended
        num_new_leaves: u64,
    },

    /// Proven version lies beyond the ledger info.
    #[error("Version {version} is newer than ledger info version {ledger_version}")]
    VersionTooNew {
        /// Version being proven
        version: u64,
        /// Version of the trusted ledger info
        ledger_version: u64,
    },

    /// A hash field inside a proof does not match the caller's value.
    #[error("{field} does not match. Hash in proof: {actual}. Expected hash: {expected}")]
    HashMismatch {
        /// Which field was compared
        field: &'static str,
        /// Hash found in the proof
        actual: HashValue,
        /// Hash the caller expected
        expected: HashValue,
    },

    /// A scalar in a response disagrees with what the request implies.
    #[error("{field} ({actual}) is not expected ({expected})")]
    UnexpectedValue {
        /// Which value was compared
        field: &'static str,
        /// Value found in the response
        actual: String,
        /// Value the request implies
        expected: String,
    },

    /// More signatures than validators.
    #[error("Too many signatures: {num_signatures} > {num_validators}")]
    TooManySignatures {
        /// Signatures supplied
        num_signatures: usize,
        /// Validators in the set
        num_validators: usize,
    },

    /// A signer is not part of the validator set.
    #[error("Author {0} is not a validator")]
    UnknownAuthor(AccountAddress),

    /// Signers do not reach the quorum.
    #[error("Too little voting power: {voting_power} < {quorum_voting_power}")]
    TooLittleVotingPower {
        /// Voting power of the signers
        voting_power: u128,
        /// Voting power required
        quorum_voting_power: u128,
    },

    /// A signature fails to verify.
    #[error("Invalid signature from {0}")]
    InvalidSignature(AccountAddress),

    /// Epoch change proof with no ledger infos.
    #[error("Epoch change proof is empty")]
    EmptyProof,

    /// Ledger info in an epoch change proof does not end its epoch.
    #[error("Ledger info at epoch {epoch} carries no next validator set")]
    MissingValidatorSet {
        /// Epoch of the offending ledger info
        epoch: u64,
    },

    /// Ledger info signed for a different epoch than the trusted one.
    #[error("Epoch mismatch: trusted epoch {expected}, ledger info epoch {actual}")]
    EpochMismatch {
        /// Epoch of the trusted validator set
        expected: u64,
        /// Epoch of the ledger info
        actual: u64,
    },

    /// Ledger info does not match the trusted waypoint.
    #[error("Waypoint mismatch: {0}")]
    WaypointMismatch(String),

    /// Server returned a ledger older than what the client already knows.
    #[error("Stale response: ledger version {ledger_version} is older than client known version {client_known_version}")]
    StaleResponse {
        /// Version of the returned ledger info
        ledger_version: u64,
        /// Version the client had already seen
        client_known_version: u64,
    },

    /// Response items do not line up with the request items.
    #[error("Request and response mismatch: {0}")]
    RequestResponseMismatch(String),

    /// Trust anchor store could not be read or written.
    #[error("Trust anchor store unavailable: {0}")]
    TrustAnchorStore(String),

    /// Hashing, encoding or key error from the crypto layer.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
