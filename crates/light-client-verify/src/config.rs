//! # Verifier Configuration
//!
//! Configuration for the ledger verifier service. Pure verification
//! functions in `domain` and `algorithms` take no configuration.

use crate::domain::{VerifyError, VerifyResult, DEFAULT_MAX_EPOCH_CHANGE_PROOF_LEN};
use serde::{Deserialize, Serialize};

/// Ledger verifier configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Verify independent response items on the rayon pool.
    ///
    /// The reported error is the first failing item in request order
    /// either way.
    pub parallel_item_verification: bool,

    /// Longest epoch change proof accepted before any signature is checked.
    pub max_epoch_change_proof_len: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            parallel_item_verification: true,
            max_epoch_change_proof_len: DEFAULT_MAX_EPOCH_CHANGE_PROOF_LEN,
        }
    }
}

impl VerifierConfig {
    /// Create a config for testing (sequential, short proofs).
    pub fn for_testing() -> Self {
        Self {
            parallel_item_verification: false,
            max_epoch_change_proof_len: 10,
        }
    }

    /// Reject settings that would refuse every epoch change.
    pub fn validate(&self) -> VerifyResult<()> {
        if self.max_epoch_change_proof_len == 0 {
            return Err(VerifyError::InvalidInput(
                "max_epoch_change_proof_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
