//! # Shared Crypto - Hashing and Signature Primitives
//!
//! The collaborator every verification crate consumes for digests and
//! validator signatures.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA3-256, domain separated | Merkle nodes, record digests |
//! | `signatures` | Ed25519 | Validator signatures over ledger infos |
//!
//! ## Security Properties
//!
//! - **Domain separation**: every digest is salted with its [`HashDomain`],
//!   so a transaction-accumulator node can never be replayed as a sparse
//!   Merkle node or a ledger info
//! - **Ed25519**: Deterministic nonces, no RNG dependency

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{
    canonical_bytes, canonical_hash, from_canonical_bytes, CryptoHash, DomainHasher, HashDomain,
    HashValue, ACCUMULATOR_PLACEHOLDER_HASH, SPARSE_MERKLE_PLACEHOLDER_HASH,
};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
