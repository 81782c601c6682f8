//! # Epoch Change
//!
//! A client trusts either a waypoint (at startup) or the validator set of
//! one epoch. An [`EpochChangeProof`] walks that trust forward one epoch
//! boundary at a time:
//!
//! ```text
//! Waypoint ──► LI(e) ──next_epoch_info──► TrustedVerifier(e+1) ──► LI(e+1) ──► ...
//! ```
//!
//! Every hop is checked under the current anchor, then the anchor becomes
//! the validator set the hop announces. There is no way back.

use crate::domain::{
    EpochInfo, LedgerInfoWithSignatures, VerifyError, VerifyResult, Waypoint,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the client currently trusts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifierType {
    /// Out-of-band pinned epoch boundary; used once, at startup.
    Waypoint(Waypoint),
    /// Authenticated validator set of a known epoch.
    TrustedVerifier(EpochInfo),
}

impl VerifierType {
    /// Check `ledger_info_with_sigs` under this anchor.
    pub fn verify(&self, ledger_info_with_sigs: &LedgerInfoWithSignatures) -> VerifyResult<()> {
        match self {
            VerifierType::Waypoint(waypoint) => waypoint.verify(ledger_info_with_sigs.ledger_info()),
            VerifierType::TrustedVerifier(epoch_info) => {
                let actual = ledger_info_with_sigs.ledger_info().epoch();
                if epoch_info.epoch != actual {
                    return Err(VerifyError::EpochMismatch {
                        expected: epoch_info.epoch,
                        actual,
                    });
                }
                ledger_info_with_sigs.verify_signatures(&epoch_info.verifier)
            }
        }
    }

    /// Whether reaching `epoch` needs an epoch change proof first.
    pub fn epoch_change_verification_required(&self, epoch: u64) -> bool {
        match self {
            VerifierType::Waypoint(_) => true,
            VerifierType::TrustedVerifier(epoch_info) => epoch_info.epoch < epoch,
        }
    }

    /// Trusted epoch, if any.
    pub fn epoch(&self) -> Option<u64> {
        match self {
            VerifierType::Waypoint(_) => None,
            VerifierType::TrustedVerifier(epoch_info) => Some(epoch_info.epoch),
        }
    }
}

/// Epoch-ending ledger infos with consecutive epochs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochChangeProof {
    /// One ledger info per epoch boundary, oldest first.
    pub ledger_info_with_sigs: Vec<LedgerInfoWithSignatures>,
    /// Whether the server has more boundaries than it sent.
    pub more: bool,
}

impl EpochChangeProof {
    /// Create an epoch change proof.
    pub fn new(ledger_info_with_sigs: Vec<LedgerInfoWithSignatures>, more: bool) -> Self {
        Self {
            ledger_info_with_sigs,
            more,
        }
    }

    /// Number of boundaries.
    pub fn len(&self) -> usize {
        self.ledger_info_with_sigs.len()
    }

    /// Whether there are no boundaries.
    pub fn is_empty(&self) -> bool {
        self.ledger_info_with_sigs.is_empty()
    }

    /// Walk the chain from `verifier` and return the last boundary, now
    /// trusted.
    ///
    /// # Algorithm
    ///
    /// 1. Reject an empty chain
    /// 2. Check each boundary under the current anchor
    /// 3. Require it to carry the next validator set and trust that set
    ///
    /// # Time Complexity: O(k · v) for k boundaries and v validators
    pub fn verify(&self, verifier: &VerifierType) -> VerifyResult<&LedgerInfoWithSignatures> {
        let mut current = verifier.clone();
        for ledger_info_with_sigs in &self.ledger_info_with_sigs {
            current.verify(ledger_info_with_sigs)?;
            let ledger_info = ledger_info_with_sigs.ledger_info();
            let next_epoch_info = ledger_info
                .next_epoch_info()
                .ok_or(VerifyError::MissingValidatorSet {
                    epoch: ledger_info.epoch(),
                })?;
            debug!(
                epoch = next_epoch_info.epoch,
                version = ledger_info.version(),
                "[light-client] Epoch change verified"
            );
            current = VerifierType::TrustedVerifier(next_epoch_info.clone());
        }
        self.ledger_info_with_sigs.last().ok_or(VerifyError::EmptyProof)
    }
}
