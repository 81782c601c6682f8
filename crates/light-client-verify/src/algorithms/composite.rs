//! # Composite Proofs
//!
//! Each composite proof chains an inner proof to a `TransactionInfo` and
//! the `TransactionInfo` to the ledger's transaction accumulator:
//!
//! ```text
//! LedgerInfo.transaction_accumulator_hash
//!     └── AccumulatorProof ──► TransactionInfo
//!                                ├── transaction_hash   (TransactionProof)
//!                                ├── state_root_hash ── SparseMerkleProof ──► account blob
//!                                └── event_root_hash ── EventAccumulatorProof ──► event
//! ```
//!
//! The inner proof is checked against a field of the `TransactionInfo`
//! first; the `TransactionInfo` is then checked against the ledger, version
//! bound included.

use super::accumulator_proof::{
    EventAccumulatorProof, TransactionAccumulatorProof, TransactionAccumulatorRangeProof,
};
use super::sparse_merkle::SparseMerkleProof;
use crate::domain::{
    invariant_same_length, invariant_version_not_newer, AccountStateBlob, LedgerInfo,
    TransactionInfo, VerifyError, VerifyResult, Version,
};
use serde::{Deserialize, Serialize};
use shared_crypto::{CryptoHash, HashValue};

/// Verify `transaction_info` is the leaf at `transaction_version` of the
/// ledger's transaction accumulator.
pub fn verify_transaction_info(
    ledger_info: &LedgerInfo,
    transaction_version: Version,
    transaction_info: &TransactionInfo,
    ledger_info_to_transaction_info_proof: &TransactionAccumulatorProof,
) -> VerifyResult<()> {
    invariant_version_not_newer(transaction_version, ledger_info.version())?;
    ledger_info_to_transaction_info_proof.verify(
        ledger_info.transaction_accumulator_hash(),
        transaction_info.hash()?,
        transaction_version,
    )
}

fn ensure_hash(field: &'static str, actual: HashValue, expected: HashValue) -> VerifyResult<()> {
    if actual != expected {
        return Err(VerifyError::HashMismatch {
            field,
            actual,
            expected,
        });
    }
    Ok(())
}

/// Proof that a transaction sits at some version of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProof {
    ledger_info_to_transaction_info_proof: TransactionAccumulatorProof,
    transaction_info: TransactionInfo,
}

impl TransactionProof {
    /// Create a transaction proof.
    pub fn new(
        ledger_info_to_transaction_info_proof: TransactionAccumulatorProof,
        transaction_info: TransactionInfo,
    ) -> Self {
        Self {
            ledger_info_to_transaction_info_proof,
            transaction_info,
        }
    }

    /// Accumulator proof of the transaction info.
    pub fn ledger_info_to_transaction_info_proof(&self) -> &TransactionAccumulatorProof {
        &self.ledger_info_to_transaction_info_proof
    }

    /// Transaction info at the leaf.
    pub fn transaction_info(&self) -> &TransactionInfo {
        &self.transaction_info
    }

    /// Verify the transaction hashing to `transaction_hash` is the one at
    /// `transaction_version`. A supplied `event_root_hash` must match too.
    pub fn verify(
        &self,
        ledger_info: &LedgerInfo,
        transaction_hash: HashValue,
        event_root_hash: Option<HashValue>,
        transaction_version: Version,
    ) -> VerifyResult<()> {
        ensure_hash(
            "transaction_hash",
            transaction_hash,
            self.transaction_info.transaction_hash,
        )?;
        if let Some(event_root_hash) = event_root_hash {
            ensure_hash(
                "event_root_hash",
                event_root_hash,
                self.transaction_info.event_root_hash,
            )?;
        }
        verify_transaction_info(
            ledger_info,
            transaction_version,
            &self.transaction_info,
            &self.ledger_info_to_transaction_info_proof,
        )
    }
}

/// Proof of an account's state (or absence) at some version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStateProof {
    ledger_info_to_transaction_info_proof: TransactionAccumulatorProof,
    transaction_info: TransactionInfo,
    transaction_info_to_account_proof: SparseMerkleProof,
}

impl AccountStateProof {
    /// Create an account state proof.
    pub fn new(
        ledger_info_to_transaction_info_proof: TransactionAccumulatorProof,
        transaction_info: TransactionInfo,
        transaction_info_to_account_proof: SparseMerkleProof,
    ) -> Self {
        Self {
            ledger_info_to_transaction_info_proof,
            transaction_info,
            transaction_info_to_account_proof,
        }
    }

    /// Accumulator proof of the transaction info.
    pub fn ledger_info_to_transaction_info_proof(&self) -> &TransactionAccumulatorProof {
        &self.ledger_info_to_transaction_info_proof
    }

    /// Transaction info whose state root holds the account.
    pub fn transaction_info(&self) -> &TransactionInfo {
        &self.transaction_info
    }

    /// Sparse Merkle proof from the state root to the account.
    pub fn transaction_info_to_account_proof(&self) -> &SparseMerkleProof {
        &self.transaction_info_to_account_proof
    }

    /// Verify the account keyed by `account_address_hash` holds
    /// `account_state_blob` at `state_version`, or with `None` does not exist.
    pub fn verify(
        &self,
        ledger_info: &LedgerInfo,
        state_version: Version,
        account_address_hash: HashValue,
        account_state_blob: Option<&AccountStateBlob>,
    ) -> VerifyResult<()> {
        self.transaction_info_to_account_proof.verify(
            self.transaction_info.state_root_hash,
            account_address_hash,
            account_state_blob,
        )?;
        verify_transaction_info(
            ledger_info,
            state_version,
            &self.transaction_info,
            &self.ledger_info_to_transaction_info_proof,
        )
    }
}

/// Proof that an event was emitted by some transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProof {
    ledger_info_to_transaction_info_proof: TransactionAccumulatorProof,
    transaction_info: TransactionInfo,
    transaction_info_to_event_proof: EventAccumulatorProof,
}

impl EventProof {
    /// Create an event proof.
    pub fn new(
        ledger_info_to_transaction_info_proof: TransactionAccumulatorProof,
        transaction_info: TransactionInfo,
        transaction_info_to_event_proof: EventAccumulatorProof,
    ) -> Self {
        Self {
            ledger_info_to_transaction_info_proof,
            transaction_info,
            transaction_info_to_event_proof,
        }
    }

    /// Transaction info of the emitting transaction.
    pub fn transaction_info(&self) -> &TransactionInfo {
        &self.transaction_info
    }

    /// Accumulator proof from the event root to the event.
    pub fn transaction_info_to_event_proof(&self) -> &EventAccumulatorProof {
        &self.transaction_info_to_event_proof
    }

    /// Verify the event hashing to `event_hash` is event number
    /// `event_index` of the transaction at `transaction_version`.
    pub fn verify(
        &self,
        ledger_info: &LedgerInfo,
        event_hash: HashValue,
        transaction_version: Version,
        event_index: u64,
    ) -> VerifyResult<()> {
        self.transaction_info_to_event_proof.verify(
            self.transaction_info.event_root_hash,
            event_hash,
            event_index,
        )?;
        verify_transaction_info(
            ledger_info,
            transaction_version,
            &self.transaction_info,
            &self.ledger_info_to_transaction_info_proof,
        )
    }
}

/// Proof of consecutive transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionListProof {
    ledger_info_to_transaction_infos_proof: TransactionAccumulatorRangeProof,
    transaction_infos: Vec<TransactionInfo>,
}

impl TransactionListProof {
    /// Create a transaction list proof.
    pub fn new(
        ledger_info_to_transaction_infos_proof: TransactionAccumulatorRangeProof,
        transaction_infos: Vec<TransactionInfo>,
    ) -> Self {
        Self {
            ledger_info_to_transaction_infos_proof,
            transaction_infos,
        }
    }

    /// Proof of an empty list.
    pub fn new_empty() -> Self {
        Self::new(TransactionAccumulatorRangeProof::new_empty(), Vec::new())
    }

    /// Range proof of the transaction infos.
    pub fn ledger_info_to_transaction_infos_proof(&self) -> &TransactionAccumulatorRangeProof {
        &self.ledger_info_to_transaction_infos_proof
    }

    /// One transaction info per transaction.
    pub fn transaction_infos(&self) -> &[TransactionInfo] {
        &self.transaction_infos
    }

    /// Verify `transaction_hashes` are the consecutive transactions starting
    /// at `first_transaction_version`.
    pub fn verify(
        &self,
        ledger_info: &LedgerInfo,
        first_transaction_version: Option<Version>,
        transaction_hashes: &[HashValue],
    ) -> VerifyResult<()> {
        invariant_same_length(
            "transaction infos vs transactions",
            self.transaction_infos.len(),
            transaction_hashes.len(),
        )?;
        for (transaction_hash, transaction_info) in transaction_hashes.iter().zip(&self.transaction_infos) {
            ensure_hash(
                "transaction_hash",
                *transaction_hash,
                transaction_info.transaction_hash,
            )?;
        }
        let transaction_info_hashes = self
            .transaction_infos
            .iter()
            .map(CryptoHash::hash)
            .collect::<Result<Vec<_>, _>>()?;
        self.ledger_info_to_transaction_infos_proof.verify(
            ledger_info.transaction_accumulator_hash(),
            first_transaction_version,
            &transaction_info_hashes,
        )
    }
}
