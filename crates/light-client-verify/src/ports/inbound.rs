//! # Inbound Ports
//!
//! What callers (a network client, a wallet) can ask of the verifier.

use crate::application::{UpdateToLatestLedgerRequest, UpdateToLatestLedgerResponse};
use crate::algorithms::VerifierType;
use crate::domain::{EpochInfo, VerifyResult};

/// Light client verification API - inbound port.
pub trait LedgerVerifierApi: Send + Sync {
    /// Verify `response` answers `request` under the `trusted` anchor.
    ///
    /// Returns the new epoch to trust when the response crossed an epoch
    /// boundary.
    fn verify_response(
        &self,
        trusted: &VerifierType,
        request: &UpdateToLatestLedgerRequest,
        response: &UpdateToLatestLedgerResponse,
    ) -> VerifyResult<Option<EpochInfo>>;
}
