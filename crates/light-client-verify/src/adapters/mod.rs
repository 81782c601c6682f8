//! # Adapters Layer (Hexagonal Architecture)
//!
//! Default implementations of the outbound ports.

mod account_state;
mod trust_store;

pub use account_state::{
    account_received_event_path, account_sent_event_path, AccountResource, AccountState,
    CanonicalAccountStateReader, ACCOUNT_RESOURCE_PATH,
};
pub use trust_store::{FileTrustAnchorStore, InMemoryTrustAnchorStore};
