//! # Ledger Infos
//!
//! The ledger info is what validators sign: a commitment to the whole
//! transaction accumulator at one version, plus the next validator set
//! when the version closes an epoch.

use super::errors::VerifyResult;
use super::validator::{ValidatorSigner, ValidatorVerifier};
use super::value_objects::{AccountAddress, Version};
use serde::{Deserialize, Serialize};
use shared_crypto::{canonical_hash, CryptoError, CryptoHash, Ed25519Signature, HashDomain, HashValue};
use std::collections::BTreeMap;
use std::fmt;

/// A validator set together with the epoch it governs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    /// Epoch number.
    pub epoch: u64,
    /// Validators of that epoch.
    pub verifier: ValidatorVerifier,
}

impl EpochInfo {
    /// Create epoch info.
    pub fn new(epoch: u64, verifier: ValidatorVerifier) -> Self {
        Self { epoch, verifier }
    }
}

impl fmt::Display for EpochInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EpochInfo [epoch: {}, validator: {}]", self.epoch, self.verifier)
    }
}

/// Summary of the committed block a ledger info certifies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Epoch the block belongs to.
    pub epoch: u64,
    /// Consensus round.
    pub round: u64,
    /// Block id.
    pub id: HashValue,
    /// Root of the transaction accumulator after the block.
    pub executed_state_id: HashValue,
    /// Version of the last transaction in the block.
    pub version: Version,
    /// Commit timestamp in microseconds.
    pub timestamp_usecs: u64,
    /// Validator set of the next epoch, present only on epoch boundaries.
    pub next_epoch_info: Option<EpochInfo>,
}

/// What validators sign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    /// Certified block.
    pub commit_info: BlockInfo,
    /// Hash of consensus data bound into the signature; opaque here.
    pub consensus_data_hash: HashValue,
}

impl LedgerInfo {
    /// Create a ledger info.
    pub fn new(commit_info: BlockInfo, consensus_data_hash: HashValue) -> Self {
        Self {
            commit_info,
            consensus_data_hash,
        }
    }

    /// Epoch of the certified block.
    pub fn epoch(&self) -> u64 {
        self.commit_info.epoch
    }

    /// Round of the certified block.
    pub fn round(&self) -> u64 {
        self.commit_info.round
    }

    /// Certified block id.
    pub fn consensus_block_id(&self) -> HashValue {
        self.commit_info.id
    }

    /// Root of the transaction accumulator.
    pub fn transaction_accumulator_hash(&self) -> HashValue {
        self.commit_info.executed_state_id
    }

    /// Latest committed version.
    pub fn version(&self) -> Version {
        self.commit_info.version
    }

    /// Commit timestamp in microseconds.
    pub fn timestamp_usecs(&self) -> u64 {
        self.commit_info.timestamp_usecs
    }

    /// Next validator set, if this ledger info ends its epoch.
    pub fn next_epoch_info(&self) -> Option<&EpochInfo> {
        self.commit_info.next_epoch_info.as_ref()
    }

    /// Whether this ledger info ends its epoch.
    pub fn has_next_epoch_info(&self) -> bool {
        self.commit_info.next_epoch_info.is_some()
    }
}

impl CryptoHash for LedgerInfo {
    fn hash(&self) -> Result<HashValue, CryptoError> {
        canonical_hash(HashDomain::LedgerInfo, self)
    }
}

impl fmt::Display for LedgerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LedgerInfo: [epoch: {}, round: {}, version: {}, accumulator root: {}]",
            self.epoch(),
            self.round(),
            self.version(),
            self.transaction_accumulator_hash()
        )
    }
}

/// A ledger info plus validator signatures over its hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfoWithSignatures {
    ledger_info: LedgerInfo,
    /// Signatures keyed by validator address.
    signatures: BTreeMap<AccountAddress, Ed25519Signature>,
}

impl LedgerInfoWithSignatures {
    /// Create from a ledger info and its signatures.
    pub fn new(ledger_info: LedgerInfo, signatures: BTreeMap<AccountAddress, Ed25519Signature>) -> Self {
        Self {
            ledger_info,
            signatures,
        }
    }

    /// Sign `ledger_info` with every signer.
    pub fn sign_with(ledger_info: LedgerInfo, signers: &[ValidatorSigner]) -> VerifyResult<Self> {
        let hash = ledger_info.hash()?;
        let signatures = signers
            .iter()
            .map(|signer| (signer.author(), signer.sign_message(&hash)))
            .collect();
        Ok(Self::new(ledger_info, signatures))
    }

    /// Signed ledger info.
    pub fn ledger_info(&self) -> &LedgerInfo {
        &self.ledger_info
    }

    /// Signatures keyed by validator address.
    pub fn signatures(&self) -> &BTreeMap<AccountAddress, Ed25519Signature> {
        &self.signatures
    }

    /// Add or replace one validator's signature.
    pub fn add_signature(&mut self, author: AccountAddress, signature: Ed25519Signature) {
        self.signatures.insert(author, signature);
    }

    /// Remove one validator's signature.
    pub fn remove_signature(&mut self, author: &AccountAddress) {
        self.signatures.remove(author);
    }

    /// Check the signatures carry a quorum of `validator` over this ledger info.
    pub fn verify_signatures(&self, validator: &ValidatorVerifier) -> VerifyResult<()> {
        validator.verify_struct_signatures(&self.ledger_info, &self.signatures)
    }
}

impl fmt::Display for LedgerInfoWithSignatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {} signatures", self.ledger_info, self.signatures.len())
    }
}
