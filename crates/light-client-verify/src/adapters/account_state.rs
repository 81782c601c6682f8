//! Account State Adapter
//!
//! Implements `AccountStateReader` for account state blobs encoded as a
//! bincode map from resource path to resource bytes.

use crate::domain::{AccountStateBlob, EventHandle, VerifyError, VerifyResult};
use crate::ports::outbound::AccountStateReader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path of the account resource inside an account state.
pub const ACCOUNT_RESOURCE_PATH: &[u8] = b"\x01LibraAccount::T";

/// Query path of the received-payments event stream.
pub fn account_received_event_path() -> Vec<u8> {
    [ACCOUNT_RESOURCE_PATH, b"/received_events_count/"].concat()
}

/// Query path of the sent-payments event stream.
pub fn account_sent_event_path() -> Vec<u8> {
    [ACCOUNT_RESOURCE_PATH, b"/sent_events_count/"].concat()
}

fn decode_error(what: &str, e: bincode::Error) -> VerifyError {
    VerifyError::InvalidInput(format!("cannot decode {}: {}", what, e))
}

/// Resources of one account keyed by path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    ordered_map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl AccountState {
    /// Decode a blob.
    pub fn from_blob(blob: &AccountStateBlob) -> VerifyResult<Self> {
        bincode::deserialize(&blob.blob).map_err(|e| decode_error("account state", e))
    }

    /// Encode into a blob.
    pub fn to_blob(&self) -> VerifyResult<AccountStateBlob> {
        bincode::serialize(self)
            .map(AccountStateBlob::new)
            .map_err(|e| decode_error("account state", e))
    }

    /// Raw resource at `path`.
    pub fn get(&self, path: &[u8]) -> Option<&[u8]> {
        self.ordered_map.get(path).map(Vec::as_slice)
    }

    /// Store a raw resource.
    pub fn insert(&mut self, path: Vec<u8>, value: Vec<u8>) {
        self.ordered_map.insert(path, value);
    }

    /// The account resource, if present.
    pub fn account_resource(&self) -> VerifyResult<Option<AccountResource>> {
        self.get(ACCOUNT_RESOURCE_PATH)
            .map(|bytes| bincode::deserialize(bytes).map_err(|e| decode_error("account resource", e)))
            .transpose()
    }

    /// Store the account resource.
    pub fn set_account_resource(&mut self, resource: &AccountResource) -> VerifyResult<()> {
        let bytes = bincode::serialize(resource).map_err(|e| decode_error("account resource", e))?;
        self.insert(ACCOUNT_RESOURCE_PATH.to_vec(), bytes);
        Ok(())
    }
}

/// The part of an account every light client reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResource {
    /// Current authentication key.
    pub authentication_key: Vec<u8>,
    /// Received-payments stream.
    pub received_events: Option<EventHandle>,
    /// Sent-payments stream.
    pub sent_events: Option<EventHandle>,
    /// Next sequence number.
    pub sequence_number: u64,
    /// Frozen accounts cannot send.
    pub is_frozen: bool,
}

impl AccountResource {
    /// Event handle for a query path; error on an unknown path.
    pub fn event_handle_by_query_path(&self, path: &[u8]) -> VerifyResult<Option<EventHandle>> {
        if path == account_received_event_path().as_slice() {
            Ok(self.received_events)
        } else if path == account_sent_event_path().as_slice() {
            Ok(self.sent_events)
        } else {
            Err(VerifyError::InvalidInput(format!(
                "unrecognized query path: {}",
                hex::encode(path)
            )))
        }
    }
}

/// `AccountStateReader` over bincode-encoded [`AccountState`] blobs.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalAccountStateReader;

impl AccountStateReader for CanonicalAccountStateReader {
    fn sequence_number(&self, blob: Option<&AccountStateBlob>) -> VerifyResult<u64> {
        let Some(blob) = blob else {
            return Ok(0);
        };
        Ok(AccountState::from_blob(blob)?
            .account_resource()?
            .map_or(0, |resource| resource.sequence_number))
    }

    fn event_handle(&self, blob: &AccountStateBlob, path: &[u8]) -> VerifyResult<Option<EventHandle>> {
        match AccountState::from_blob(blob)?.account_resource()? {
            Some(resource) => resource.event_handle_by_query_path(path),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountAddress, EventKey};

    fn blob_with(resource: Option<AccountResource>) -> AccountStateBlob {
        let mut state = AccountState::default();
        if let Some(resource) = resource {
            state.set_account_resource(&resource).unwrap();
        }
        state.to_blob().unwrap()
    }

    #[test]
    fn test_sequence_number() {
        let reader = CanonicalAccountStateReader;
        let blob = blob_with(Some(AccountResource {
            sequence_number: 12,
            ..Default::default()
        }));
        assert_eq!(reader.sequence_number(Some(&blob)).unwrap(), 12);
        assert_eq!(reader.sequence_number(None).unwrap(), 0);
        assert_eq!(reader.sequence_number(Some(&blob_with(None))).unwrap(), 0);
    }

    #[test]
    fn test_event_handle_by_path() {
        let address = AccountAddress::new([4; 16]);
        let sent = EventHandle::new(EventKey::new_from_address(&address, 1), 3);
        let blob = blob_with(Some(AccountResource {
            sent_events: Some(sent),
            ..Default::default()
        }));
        let reader = CanonicalAccountStateReader;
        assert_eq!(reader.event_handle(&blob, &account_sent_event_path()).unwrap(), Some(sent));
        assert_eq!(reader.event_handle(&blob, &account_received_event_path()).unwrap(), None);
        assert!(matches!(
            reader.event_handle(&blob, b"nonsense"),
            Err(VerifyError::InvalidInput(_))
        ));
        assert_eq!(reader.event_handle(&blob_with(None), b"nonsense").unwrap(), None);
    }

    #[test]
    fn test_garbage_blob_rejected() {
        let reader = CanonicalAccountStateReader;
        let blob = AccountStateBlob::new(vec![0xff; 3]);
        assert!(reader.sequence_number(Some(&blob)).is_err());
    }
}
