//! # Transactions, Transaction Infos and Events
//!
//! The committed records a light client asks about. Each one hashes its
//! canonical (bincode) bytes under its own domain.

use super::value_objects::{AccountAddress, EventKey};
use serde::{Deserialize, Serialize};
use shared_crypto::{canonical_hash, CryptoError, CryptoHash, HashDomain, HashValue};

/// Execution summary of one committed transaction; leaf of the transaction
/// accumulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// Hash of the transaction.
    pub transaction_hash: HashValue,
    /// State tree root after the transaction.
    pub state_root_hash: HashValue,
    /// Root of the transaction's event accumulator.
    pub event_root_hash: HashValue,
    /// Gas consumed.
    pub gas_used: u64,
    /// VM status code.
    pub major_status: u64,
}

impl TransactionInfo {
    /// Create a transaction info.
    pub fn new(
        transaction_hash: HashValue,
        state_root_hash: HashValue,
        event_root_hash: HashValue,
        gas_used: u64,
        major_status: u64,
    ) -> Self {
        Self {
            transaction_hash,
            state_root_hash,
            event_root_hash,
            gas_used,
            major_status,
        }
    }
}

impl CryptoHash for TransactionInfo {
    fn hash(&self) -> Result<HashValue, CryptoError> {
        canonical_hash(HashDomain::TransactionInfo, self)
    }
}

/// A transaction submitted and signed by an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Sending account.
    pub sender: AccountAddress,
    /// Sender's sequence number for this transaction.
    pub sequence_number: u64,
    /// Opaque script or module payload.
    pub payload: Vec<u8>,
    /// Gas limit.
    pub max_gas_amount: u64,
    /// Price per gas unit.
    pub gas_unit_price: u64,
    /// Expiration in seconds since the epoch.
    pub expiration_timestamp_secs: u64,
}

/// Block prologue recorded by consensus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Block id.
    pub id: HashValue,
    /// Consensus round.
    pub round: u64,
    /// Block timestamp in microseconds.
    pub timestamp_usecs: u64,
    /// Block proposer.
    pub proposer: AccountAddress,
}

/// Any committed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    /// Account-submitted transaction.
    UserTransaction(SignedTransaction),
    /// Genesis or epoch write set, opaque here.
    WriteSet(Vec<u8>),
    /// Block prologue.
    BlockMetadata(BlockMetadata),
}

impl Transaction {
    /// The signed user transaction, if this is one.
    pub fn as_signed_user_txn(&self) -> Option<&SignedTransaction> {
        match self {
            Transaction::UserTransaction(txn) => Some(txn),
            _ => None,
        }
    }
}

impl CryptoHash for Transaction {
    fn hash(&self) -> Result<HashValue, CryptoError> {
        canonical_hash(HashDomain::Transaction, self)
    }
}

/// Event emitted by a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    /// Stream the event belongs to.
    pub key: EventKey,
    /// Position within the stream.
    pub sequence_number: u64,
    /// Type name of the payload.
    pub type_tag: String,
    /// Opaque payload.
    pub event_data: Vec<u8>,
}

impl ContractEvent {
    /// Create an event.
    pub fn new(key: EventKey, sequence_number: u64, type_tag: String, event_data: Vec<u8>) -> Self {
        Self {
            key,
            sequence_number,
            type_tag,
            event_data,
        }
    }
}

impl CryptoHash for ContractEvent {
    fn hash(&self) -> Result<HashValue, CryptoError> {
        canonical_hash(HashDomain::ContractEvent, self)
    }
}
