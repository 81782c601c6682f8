//! # Authenticated Payloads
//!
//! Payloads as a server returns them, each paired with the composite proof
//! that binds it to a ledger info. Verification also checks the payload is
//! the one the caller asked for (version, sender, key, sequence number).

use super::composite::{AccountStateProof, EventProof, TransactionListProof, TransactionProof};
use crate::domain::{
    invariant_same_length, AccountAddress, AccountStateBlob, ContractEvent, EventAccumulatorHasher,
    EventKey, InMemoryAccumulator, LedgerInfo, Transaction, VerifyError, VerifyResult, Version,
};
use crate::ports::AccountStateReader;
use serde::{Deserialize, Serialize};
use shared_crypto::{CryptoHash, HashValue};
use std::fmt::Display;

fn ensure_value<T: PartialEq + Display>(field: &'static str, actual: T, expected: T) -> VerifyResult<()> {
    if actual != expected {
        return Err(VerifyError::UnexpectedValue {
            field,
            actual: actual.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Root of the event accumulator holding `events`.
pub fn event_root_hash(events: &[ContractEvent]) -> VerifyResult<HashValue> {
    let event_hashes = events
        .iter()
        .map(CryptoHash::hash)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(InMemoryAccumulator::<EventAccumulatorHasher>::from_leaves(&event_hashes).root_hash())
}

/// A transaction, optionally its events, and its proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionWithProof {
    /// Version of the transaction.
    pub version: Version,
    /// The transaction.
    pub transaction: Transaction,
    /// Events it emitted, when requested.
    pub events: Option<Vec<ContractEvent>>,
    /// Proof against the ledger.
    pub proof: TransactionProof,
}

impl TransactionWithProof {
    /// Create a transaction with proof.
    pub fn new(
        version: Version,
        transaction: Transaction,
        events: Option<Vec<ContractEvent>>,
        proof: TransactionProof,
    ) -> Self {
        Self {
            version,
            transaction,
            events,
            proof,
        }
    }

    /// Verify the transaction (and events, if carried) is the one at `version`.
    pub fn verify(&self, ledger_info: &LedgerInfo, version: Version) -> VerifyResult<()> {
        ensure_value("version", self.version, version)?;
        let events_root_hash = self.events.as_deref().map(event_root_hash).transpose()?;
        self.proof
            .verify(ledger_info, self.transaction.hash()?, events_root_hash, version)
    }

    /// Verify this is the user transaction `sender` sent with
    /// `sequence_number`, committed at `version`.
    pub fn verify_user_txn(
        &self,
        ledger_info: &LedgerInfo,
        version: Version,
        sender: AccountAddress,
        sequence_number: u64,
    ) -> VerifyResult<()> {
        let signed_transaction = self.transaction.as_signed_user_txn().ok_or_else(|| {
            VerifyError::InvalidInput(format!(
                "transaction at version {} is not a user transaction",
                self.version
            ))
        })?;
        ensure_value("sender", signed_transaction.sender, sender)?;
        ensure_value(
            "sequence_number",
            signed_transaction.sequence_number,
            sequence_number,
        )?;
        self.verify(ledger_info, version)
    }
}

/// An account's state blob (or absence) and its proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStateWithProof {
    /// Version the state is read at.
    pub version: Version,
    /// State blob; `None` when the account does not exist.
    pub blob: Option<AccountStateBlob>,
    /// Proof against the ledger.
    pub proof: AccountStateProof,
}

impl AccountStateWithProof {
    /// Create an account state with proof.
    pub fn new(version: Version, blob: Option<AccountStateBlob>, proof: AccountStateProof) -> Self {
        Self {
            version,
            blob,
            proof,
        }
    }

    /// Verify this is the state of `address` at `version`.
    pub fn verify(&self, ledger_info: &LedgerInfo, version: Version, address: AccountAddress) -> VerifyResult<()> {
        ensure_value("version", self.version, version)?;
        self.proof
            .verify(ledger_info, version, address.hash()?, self.blob.as_ref())
    }

    /// Key and event count of the stream at `path`.
    ///
    /// `(None, 0)` when the account or the resource holding the handle does
    /// not exist; an error when the path itself is not understood.
    pub fn event_key_and_count_by_query_path<R: AccountStateReader + ?Sized>(
        &self,
        path: &[u8],
        reader: &R,
    ) -> VerifyResult<(Option<EventKey>, u64)> {
        let Some(blob) = &self.blob else {
            return Ok((None, 0));
        };
        Ok(reader
            .event_handle(blob, path)?
            .map_or((None, 0), |handle| (Some(handle.key), handle.count)))
    }
}

/// One event and its proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWithProof {
    /// Version of the emitting transaction.
    pub transaction_version: Version,
    /// Index of the event within the transaction.
    pub event_index: u64,
    /// The event.
    pub event: ContractEvent,
    /// Proof against the ledger.
    pub proof: EventProof,
}

impl EventWithProof {
    /// Create an event with proof.
    pub fn new(transaction_version: Version, event_index: u64, event: ContractEvent, proof: EventProof) -> Self {
        Self {
            transaction_version,
            event_index,
            event,
            proof,
        }
    }

    /// Verify this is event `sequence_number` of stream `event_key`, emitted
    /// as event `event_index` of the transaction at `transaction_version`.
    pub fn verify(
        &self,
        ledger_info: &LedgerInfo,
        event_key: &EventKey,
        sequence_number: u64,
        transaction_version: Version,
        event_index: u64,
    ) -> VerifyResult<()> {
        if self.event.key != *event_key {
            return Err(VerifyError::UnexpectedValue {
                field: "event_key",
                actual: format!("{:?}", self.event.key),
                expected: format!("{:?}", event_key),
            });
        }
        ensure_value("sequence_number", self.event.sequence_number, sequence_number)?;
        ensure_value("transaction_version", self.transaction_version, transaction_version)?;
        ensure_value("event_index", self.event_index, event_index)?;
        self.proof
            .verify(ledger_info, self.event.hash()?, transaction_version, event_index)
    }
}

/// Consecutive transactions, optionally their events, and one range proof.
///
/// An empty list has no first version and an empty proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionListWithProof {
    /// The transactions.
    pub transactions: Vec<Transaction>,
    /// Events per transaction, when requested.
    pub events: Option<Vec<Vec<ContractEvent>>>,
    /// Version of the first transaction.
    pub first_transaction_version: Option<Version>,
    /// Proof against the ledger.
    pub proof: TransactionListProof,
}

impl TransactionListWithProof {
    /// Create a transaction list with proof.
    pub fn new(
        transactions: Vec<Transaction>,
        events: Option<Vec<Vec<ContractEvent>>>,
        first_transaction_version: Option<Version>,
        proof: TransactionListProof,
    ) -> Self {
        Self {
            transactions,
            events,
            first_transaction_version,
            proof,
        }
    }

    /// Empty list.
    pub fn new_empty() -> Self {
        Self::new(Vec::new(), None, None, TransactionListProof::new_empty())
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Verify the transactions are consecutive from `first_transaction_version`,
    /// and that any carried events match each transaction's event root.
    pub fn verify(&self, ledger_info: &LedgerInfo, first_transaction_version: Option<Version>) -> VerifyResult<()> {
        if self.first_transaction_version != first_transaction_version {
            return Err(VerifyError::UnexpectedValue {
                field: "first_transaction_version",
                actual: format!("{:?}", self.first_transaction_version),
                expected: format!("{:?}", first_transaction_version),
            });
        }

        let transaction_hashes = self
            .transactions
            .iter()
            .map(CryptoHash::hash)
            .collect::<Result<Vec<_>, _>>()?;
        self.proof
            .verify(ledger_info, first_transaction_version, &transaction_hashes)?;

        if let Some(event_lists) = &self.events {
            invariant_same_length("event lists vs transactions", event_lists.len(), self.transactions.len())?;
            for (events, transaction_info) in event_lists.iter().zip(self.proof.transaction_infos()) {
                let actual = event_root_hash(events)?;
                if actual != transaction_info.event_root_hash {
                    return Err(VerifyError::HashMismatch {
                        field: "event_root_hash",
                        actual,
                        expected: transaction_info.event_root_hash,
                    });
                }
            }
        }
        Ok(())
    }
}
