//! # Value Objects
//!
//! Small immutable ledger identifiers: account addresses, event keys and
//! handles, access paths and raw account state blobs.

use super::errors::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use shared_crypto::{CryptoError, CryptoHash, HashDomain, HashValue};
use std::fmt;
use std::str::FromStr;

/// Ledger version: index of a transaction in the transaction accumulator.
pub type Version = u64;

/// Account address (16 bytes).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; AccountAddress::LENGTH]);

impl AccountAddress {
    /// Address length in bytes.
    pub const LENGTH: usize = 16;

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice of exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> VerifyResult<Self> {
        let array: [u8; Self::LENGTH] = bytes.try_into().map_err(|_| {
            VerifyError::InvalidInput(format!(
                "account address must be {} bytes, got {}",
                Self::LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl CryptoHash for AccountAddress {
    /// Key of the account in the state tree.
    fn hash(&self) -> Result<HashValue, CryptoError> {
        Ok(HashDomain::AccountAddress.hash(&self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self)
    }
}

impl FromStr for AccountAddress {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| VerifyError::Crypto(CryptoError::InvalidHex(e.to_string())))?;
        Self::from_slice(&bytes)
    }
}

/// Globally unique event stream identifier: creation salt followed by the
/// owning account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey([u8; EventKey::LENGTH]);

impl EventKey {
    /// Key length in bytes.
    pub const LENGTH: usize = 8 + AccountAddress::LENGTH;

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Key of the `salt`-th event stream created by `address`.
    pub fn new_from_address(address: &AccountAddress, salt: u64) -> Self {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[..8].copy_from_slice(&salt.to_le_bytes());
        bytes[8..].copy_from_slice(address.as_bytes());
        Self(bytes)
    }

    /// Account that owns the stream.
    pub fn address(&self) -> AccountAddress {
        let mut bytes = [0u8; AccountAddress::LENGTH];
        bytes.copy_from_slice(&self.0[8..]);
        AccountAddress::new(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKey({})", hex::encode(self.0))
    }
}

/// Event stream pointer stored in an account resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHandle {
    /// Number of events emitted so far.
    pub count: u64,
    /// Stream identifier.
    pub key: EventKey,
}

impl EventHandle {
    /// Create a handle.
    pub fn new(key: EventKey, count: u64) -> Self {
        Self { count, key }
    }
}

/// Location of a resource within an account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessPath {
    /// Owning account.
    pub address: AccountAddress,
    /// Path inside the account state.
    pub path: Vec<u8>,
}

impl AccessPath {
    /// Create an access path.
    pub fn new(address: AccountAddress, path: Vec<u8>) -> Self {
        Self { address, path }
    }
}

/// Opaque serialized account state.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStateBlob {
    /// Raw bytes.
    pub blob: Vec<u8>,
}

impl AccountStateBlob {
    /// Wrap raw bytes.
    pub fn new(blob: Vec<u8>) -> Self {
        Self { blob }
    }
}

impl From<Vec<u8>> for AccountStateBlob {
    fn from(blob: Vec<u8>) -> Self {
        Self { blob }
    }
}

impl CryptoHash for AccountStateBlob {
    /// Value hash stored in the state tree leaf.
    fn hash(&self) -> Result<HashValue, CryptoError> {
        Ok(HashDomain::AccountStateBlob.hash(&self.blob))
    }
}

impl fmt::Debug for AccountStateBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountStateBlob({} bytes)", self.blob.len())
    }
}
