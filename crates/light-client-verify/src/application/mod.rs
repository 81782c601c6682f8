//! # Application Module
//!
//! The update-to-latest-ledger round trip: request/response records and
//! the service that authenticates a response.

pub mod messages;
pub mod service;

pub use messages::{RequestItem, ResponseItem, UpdateToLatestLedgerRequest, UpdateToLatestLedgerResponse};
pub use service::{expected_event_sequence_numbers, LedgerVerifierService};
