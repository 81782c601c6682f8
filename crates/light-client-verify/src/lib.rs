//! # Light Client Verify
//!
//! Authenticates data served by an untrusted full node against a small
//! trust anchor held by the client.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A light client keeps one waypoint or one validator set. Every answer it
//! receives carries a proof that ties the payload to a ledger info signed
//! by a quorum of that validator set:
//! - Transactions and their infos through the transaction accumulator
//! - Account state through the sparse Merkle tree
//! - Events through the per-transaction event accumulator
//! - Validator set rotation through epoch change proofs
//!
//! ## Security Properties
//!
//! | Defense | Description |
//! |---------|-------------|
//! | Quorum signatures | More than 2/3 of voting power must sign each ledger info |
//! | Domain separated hashing | Nodes of one tree cannot be replayed in another |
//! | Epoch chaining | Each validator set is introduced by its predecessor |
//! | Freshness | Responses older than the client's known version are rejected |
//! | Bounded proofs | Depth and length limits are checked before any hashing |
//!
//! ## Module Structure
//!
//! ```text
//! light-client-verify/
//! ├── domain/          # Positions, accumulators, ledger records, validators, errors
//! ├── algorithms/      # Accumulator, sparse Merkle, composite and epoch change proofs
//! ├── ports/           # API trait (inbound) + account state / trust store (outbound)
//! ├── adapters/        # Canonical account state decoding, in-memory trust store
//! ├── application/     # LedgerVerifierService and request/response records
//! └── config.rs        # VerifierConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::{CanonicalAccountStateReader, FileTrustAnchorStore, InMemoryTrustAnchorStore};
pub use algorithms::{
    AccountStateWithProof, EpochChangeProof, EventWithProof, MerkleAccumulator, SparseMerkleProof,
    SparseMerkleTree, TransactionAccumulatorProof, TransactionAccumulatorRangeProof,
    TransactionListWithProof, TransactionWithProof, VerifierType,
};
pub use application::{
    LedgerVerifierService, RequestItem, ResponseItem, UpdateToLatestLedgerRequest,
    UpdateToLatestLedgerResponse,
};
pub use config::VerifierConfig;
pub use domain::{
    AccountAddress, EpochInfo, HashValue, InMemoryAccumulator, LedgerInfo, LedgerInfoWithSignatures,
    Position, TransactionAccumulatorHasher, TransactionInfo, ValidatorVerifier, VerifyError,
    VerifyResult, Version, Waypoint,
};
pub use ports::{AccountStateReader, LedgerVerifierApi, TrustAnchorStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
