//! # Algorithms Module
//!
//! Proof verification on top of the domain types:
//!
//! - `accumulator_proof` - single-leaf, range and consistency proofs
//! - `sparse_merkle` - inclusion / non-inclusion and range proofs
//! - `composite` - proofs chained through a `TransactionInfo`
//! - `with_proof` - payloads bound to composite proofs
//! - `epoch_change` - trust anchor and epoch change proofs
//! - `proof_builder` - full trees that produce the proofs above

pub mod accumulator_proof;
pub mod composite;
pub mod epoch_change;
pub mod proof_builder;
pub mod sparse_merkle;
pub mod with_proof;

pub use accumulator_proof::{
    AccumulatorConsistencyProof, AccumulatorProof, AccumulatorRangeProof, EventAccumulatorProof,
    TransactionAccumulatorConsistencyProof, TransactionAccumulatorProof,
    TransactionAccumulatorRangeProof,
};
#[cfg(any(test, feature = "test-utils"))]
pub use accumulator_proof::{TestAccumulatorProof, TestAccumulatorRangeProof};
pub use composite::{
    verify_transaction_info, AccountStateProof, EventProof, TransactionListProof, TransactionProof,
};
pub use epoch_change::{EpochChangeProof, VerifierType};
pub use proof_builder::{MerkleAccumulator, SparseMerkleTree};
pub use sparse_merkle::{
    sparse_merkle_internal_hash, SparseMerkleLeafNode, SparseMerkleProof, SparseMerkleRangeProof,
};
pub use with_proof::{
    event_root_hash, AccountStateWithProof, EventWithProof, TransactionListWithProof,
    TransactionWithProof,
};
