//! Trust Anchor Stores
//!
//! Implementations of `TrustAnchorStore`:
//! - [`InMemoryTrustAnchorStore`] for clients that keep their anchor in
//!   process memory, and for tests
//! - [`FileTrustAnchorStore`] persists the anchor as one bincode file,
//!   replaced atomically through a temp file

use crate::algorithms::VerifierType;
use crate::domain::{VerifyError, VerifyResult};
use crate::ports::outbound::TrustAnchorStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Trust anchor held behind a lock.
#[derive(Debug)]
pub struct InMemoryTrustAnchorStore {
    anchor: RwLock<VerifierType>,
}

impl InMemoryTrustAnchorStore {
    /// Start from `anchor`.
    pub fn new(anchor: VerifierType) -> Self {
        Self {
            anchor: RwLock::new(anchor),
        }
    }

    /// Current anchor, without going through the port.
    pub fn current(&self) -> VerifierType {
        self.anchor.read().clone()
    }
}

#[async_trait]
impl TrustAnchorStore for InMemoryTrustAnchorStore {
    async fn load(&self) -> VerifyResult<VerifierType> {
        Ok(self.current())
    }

    async fn store(&self, anchor: VerifierType) -> VerifyResult<()> {
        debug!(epoch = ?anchor.epoch(), "[light-client] Storing trust anchor");
        *self.anchor.write() = anchor;
        Ok(())
    }
}

/// Trust anchor persisted to a file between sessions.
#[derive(Debug, Clone)]
pub struct FileTrustAnchorStore {
    path: PathBuf,
}

impl FileTrustAnchorStore {
    /// Store backed by `path`. Nothing is read until [`load`](TrustAnchorStore::load).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `path`, seeded with `anchor` when no file exists yet.
    pub async fn open_or_init<P: AsRef<Path>>(path: P, anchor: VerifierType) -> VerifyResult<Self> {
        let store = Self::new(path);
        let exists = tokio::fs::try_exists(&store.path)
            .await
            .map_err(|e| store.io_error("probe", e))?;
        if exists {
            info!(path = %store.path.display(), "[light-client] Found existing trust anchor file");
        } else {
            info!(path = %store.path.display(), "[light-client] Seeding trust anchor file");
            store.store(anchor).await?;
        }
        Ok(store)
    }

    /// File holding the anchor.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> VerifyError {
        VerifyError::TrustAnchorStore(format!("{} {}: {}", action, self.path.display(), error))
    }
}

#[async_trait]
impl TrustAnchorStore for FileTrustAnchorStore {
    async fn load(&self) -> VerifyResult<VerifierType> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.io_error("read", e))?;
        bincode::deserialize(&bytes).map_err(|e| {
            VerifyError::TrustAnchorStore(format!("decode {}: {}", self.path.display(), e))
        })
    }

    async fn store(&self, anchor: VerifierType) -> VerifyResult<()> {
        let bytes = bincode::serialize(&anchor)
            .map_err(|e| VerifyError::TrustAnchorStore(format!("encode anchor: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error("create directory for", e))?;
        }

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| self.io_error("write", e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.io_error("replace", e))?;

        debug!(epoch = ?anchor.epoch(), path = %self.path.display(), "[light-client] Persisted trust anchor");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{deterministic_validator_set, EpochInfo};

    #[tokio::test]
    async fn test_store_replaces_anchor() {
        let (_, verifier) = deterministic_validator_set(2, 1);
        let store = InMemoryTrustAnchorStore::new(VerifierType::TrustedVerifier(EpochInfo::new(1, verifier.clone())));
        assert_eq!(store.load().await.unwrap().epoch(), Some(1));

        store
            .store(VerifierType::TrustedVerifier(EpochInfo::new(2, verifier)))
            .await
            .unwrap();
        assert_eq!(store.current().epoch(), Some(2));
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchor").join("trusted.bin");
        let (_, verifier) = deterministic_validator_set(3, 1);

        let store = FileTrustAnchorStore::open_or_init(&path, VerifierType::TrustedVerifier(EpochInfo::new(1, verifier.clone())))
            .await
            .unwrap();
        store
            .store(VerifierType::TrustedVerifier(EpochInfo::new(4, verifier.clone())))
            .await
            .unwrap();

        // Reopening keeps the stored anchor instead of the seed
        let reopened = FileTrustAnchorStore::open_or_init(&path, VerifierType::TrustedVerifier(EpochInfo::new(1, verifier)))
            .await
            .unwrap();
        let anchor = reopened.load().await.unwrap();
        assert_eq!(anchor.epoch(), Some(4));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_failures_are_store_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FileTrustAnchorStore::new(dir.path().join("missing.bin"));
        assert!(matches!(missing.load().await, Err(VerifyError::TrustAnchorStore(_))));

        let corrupt_path = dir.path().join("corrupt.bin");
        std::fs::write(&corrupt_path, [0xffu8; 3]).unwrap();
        let corrupt = FileTrustAnchorStore::new(&corrupt_path);
        assert!(matches!(corrupt.load().await, Err(VerifyError::TrustAnchorStore(_))));
    }
}
