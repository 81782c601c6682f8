//! # Outbound Ports
//!
//! Collaborators the verifier depends on but does not implement itself:
//! decoding account state blobs and persisting the trust anchor.

use crate::algorithms::VerifierType;
use crate::domain::{AccountStateBlob, EventHandle, VerifyResult};
use async_trait::async_trait;

/// Decodes account state blobs.
///
/// The blob layout belongs to the execution layer; the verifier only needs
/// two facts out of it.
pub trait AccountStateReader: Send + Sync {
    /// Sequence number of the account; 0 when the account does not exist.
    fn sequence_number(&self, blob: Option<&AccountStateBlob>) -> VerifyResult<u64>;

    /// Event handle stored at the query `path`.
    ///
    /// `Ok(None)` when the resource holding the handle is absent; an error
    /// when the path is not understood.
    fn event_handle(&self, blob: &AccountStateBlob, path: &[u8]) -> VerifyResult<Option<EventHandle>>;
}

/// Durable storage of the client's trust anchor between sessions.
#[async_trait]
pub trait TrustAnchorStore: Send + Sync {
    /// Current anchor.
    async fn load(&self) -> VerifyResult<VerifierType>;

    /// Replace the anchor.
    async fn store(&self, anchor: VerifierType) -> VerifyResult<()>;
}
