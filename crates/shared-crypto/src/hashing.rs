//! # Domain-Separated Hashing
//!
//! SHA3-256 hashing where every digest is bound to a [`HashDomain`].
//!
//! ## Construction
//!
//! ```text
//! salt(domain)    = SHA3-256("LEDGER::" || domain.name())
//! H(domain, data) = SHA3-256(salt(domain) || data)
//! ```
//!
//! Two records of different kinds can never collide by construction: the
//! first 32 bytes fed to the hasher differ per domain.

use crate::CryptoError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::OnceLock;

/// Prefix mixed into every domain salt.
const DOMAIN_PREFIX: &[u8] = b"LEDGER::";

/// A 32-byte SHA3-256 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HashValue([u8; HashValue::LENGTH]);

impl HashValue {
    /// Digest length in bytes.
    pub const LENGTH: usize = 32;
    /// Digest length in bits (depth of the sparse Merkle tree).
    pub const LENGTH_IN_BITS: usize = Self::LENGTH * 8;

    /// Wrap raw digest bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// The all-zero digest.
    pub const fn zero() -> Self {
        Self([0u8; Self::LENGTH])
    }

    /// Build a digest from an ASCII tag, zero-padded on the right.
    const fn from_padded(tag: &[u8]) -> Self {
        let mut out = [0u8; Self::LENGTH];
        let mut i = 0;
        while i < tag.len() && i < Self::LENGTH {
            out[i] = tag[i];
            i += 1;
        }
        Self(out)
    }

    /// Parse from a byte slice of exactly [`HashValue::LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; Self::LENGTH] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidHashLength {
                    expected: Self::LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Copy into an owned byte vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Bit `index`, counting from the most significant bit of byte 0.
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < Self::LENGTH_IN_BITS);
        let byte = self.0[index / 8];
        (byte >> (7 - index % 8)) & 1 == 1
    }

    /// Iterate over all bits, most significant first.
    pub fn iter_bits(&self) -> impl DoubleEndedIterator<Item = bool> + ExactSizeIterator + '_ {
        (0..Self::LENGTH_IN_BITS).map(move |i| self.bit(i))
    }

    /// Number of leading bits shared with `other`.
    pub fn common_prefix_bits_len(&self, other: &HashValue) -> usize {
        for (i, (a, b)) in self.0.iter().zip(other.0.iter()).enumerate() {
            let diff = a ^ b;
            if diff != 0 {
                return i * 8 + diff.leading_zeros() as usize;
            }
        }
        Self::LENGTH_IN_BITS
    }

    /// Lower-case hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashValue({})", self.to_hex())
    }
}

impl FromStr for HashValue {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; HashValue::LENGTH]> for HashValue {
    fn from(bytes: [u8; HashValue::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for HashValue {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Stands in for an empty subtree of a Merkle accumulator.
pub const ACCUMULATOR_PLACEHOLDER_HASH: HashValue =
    HashValue::from_padded(b"ACCUMULATOR_PLACEHOLDER_HASH");

/// Stands in for an empty subtree of a sparse Merkle tree.
pub const SPARSE_MERKLE_PLACEHOLDER_HASH: HashValue =
    HashValue::from_padded(b"SPARSE_MERKLE_PLACEHOLDER_HASH");

/// Hash domains. Each tree role and each hashed record kind has its own tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashDomain {
    /// Internal node of the ledger's transaction accumulator.
    TransactionAccumulator,
    /// Internal node of a per-transaction event accumulator.
    EventAccumulator,
    /// Internal node of the account-state sparse Merkle tree.
    SparseMerkleInternal,
    /// Leaf node of the account-state sparse Merkle tree.
    SparseMerkleLeaf,
    /// `TransactionInfo` record.
    TransactionInfo,
    /// `LedgerInfo` record (the message validators sign).
    LedgerInfo,
    /// Reduced ledger-info projection committed to by a waypoint.
    Waypoint,
    /// Contract event record.
    ContractEvent,
    /// Transaction record.
    Transaction,
    /// Raw account state blob.
    AccountStateBlob,
    /// Account address (the sparse Merkle key).
    AccountAddress,
    /// Accumulators built by tests and benchmarks.
    #[cfg(any(test, feature = "test-utils"))]
    TestOnly,
}

impl HashDomain {
    const COUNT: usize = 12;

    /// Slot of this domain in the salt table.
    const fn slot(self) -> usize {
        match self {
            HashDomain::TransactionAccumulator => 0,
            HashDomain::EventAccumulator => 1,
            HashDomain::SparseMerkleInternal => 2,
            HashDomain::SparseMerkleLeaf => 3,
            HashDomain::TransactionInfo => 4,
            HashDomain::LedgerInfo => 5,
            HashDomain::Waypoint => 6,
            HashDomain::ContractEvent => 7,
            HashDomain::Transaction => 8,
            HashDomain::AccountStateBlob => 9,
            HashDomain::AccountAddress => 10,
            #[cfg(any(test, feature = "test-utils"))]
            HashDomain::TestOnly => 11,
        }
    }

    /// Tag name mixed into the salt.
    pub const fn name(self) -> &'static str {
        match self {
            HashDomain::TransactionAccumulator => "TransactionAccumulator",
            HashDomain::EventAccumulator => "EventAccumulator",
            HashDomain::SparseMerkleInternal => "SparseMerkleInternal",
            HashDomain::SparseMerkleLeaf => "SparseMerkleLeafNode",
            HashDomain::TransactionInfo => "TransactionInfo",
            HashDomain::LedgerInfo => "LedgerInfo",
            HashDomain::Waypoint => "Ledger2WaypointConverter",
            HashDomain::ContractEvent => "ContractEvent",
            HashDomain::Transaction => "Transaction",
            HashDomain::AccountStateBlob => "AccountStateBlob",
            HashDomain::AccountAddress => "AccountAddress",
            #[cfg(any(test, feature = "test-utils"))]
            HashDomain::TestOnly => "TestOnlyHasher",
        }
    }

    /// Salt for this domain, computed once per process.
    pub fn salt(self) -> HashValue {
        static SALTS: [OnceLock<HashValue>; HashDomain::COUNT] =
            [const { OnceLock::new() }; HashDomain::COUNT];
        *SALTS[self.slot()].get_or_init(|| {
            let mut hasher = Sha3_256::new();
            hasher.update(DOMAIN_PREFIX);
            hasher.update(self.name().as_bytes());
            HashValue(hasher.finalize().into())
        })
    }

    /// Start a streaming hasher in this domain.
    pub fn hasher(self) -> DomainHasher {
        DomainHasher::new(self)
    }

    /// One-shot `H(domain, data)`.
    pub fn hash(self, data: &[u8]) -> HashValue {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Hash of an internal node: `H(domain, left || right)`.
    pub fn hash_pair(self, left: &HashValue, right: &HashValue) -> HashValue {
        let mut hasher = self.hasher();
        hasher.update(left.as_bytes()).update(right.as_bytes());
        hasher.finalize()
    }
}

/// Streaming SHA3-256 hasher pre-seeded with a domain salt.
///
/// Implements [`io::Write`] so canonical encoders can stream straight into it.
#[derive(Clone)]
pub struct DomainHasher {
    inner: Sha3_256,
}

impl DomainHasher {
    /// Create a hasher for `domain`.
    pub fn new(domain: HashDomain) -> Self {
        let mut inner = Sha3_256::new();
        inner.update(domain.salt().as_bytes());
        Self { inner }
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> HashValue {
        HashValue(self.inner.finalize().into())
    }
}

impl io::Write for DomainHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A record that knows how to produce its own domain-separated digest.
pub trait CryptoHash {
    /// Digest of the record's canonical bytes under its domain.
    fn hash(&self) -> Result<HashValue, CryptoError>;
}

/// Canonical (bincode) bytes of a serde record.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CryptoError> {
    bincode::serialize(value).map_err(|e| CryptoError::Serialization(e.to_string()))
}

/// Decode canonical bytes produced by [`canonical_bytes`].
pub fn from_canonical_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CryptoError> {
    bincode::deserialize(bytes).map_err(|e| CryptoError::Serialization(e.to_string()))
}

/// `H(domain, canonical_bytes(value))`, streamed without an intermediate buffer.
pub fn canonical_hash<T: Serialize + ?Sized>(
    domain: HashDomain,
    value: &T,
) -> Result<HashValue, CryptoError> {
    let mut hasher = domain.hasher();
    bincode::serialize_into(&mut hasher, value)
        .map_err(|e| CryptoError::Serialization(e.to_string()))?;
    Ok(hasher.finalize())
}
