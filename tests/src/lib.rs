//! # Light Client Verification Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── integration/      # Client and server flows across modules
//! │   ├── accumulator_flows.rs
//! │   ├── epoch_flows.rs
//! │   └── ledger_round_trip.rs
//! │
//! └── properties.rs     # Randomized builder/verifier agreement
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p light-client-tests
//!
//! # By category
//! cargo test -p light-client-tests integration::
//! cargo test -p light-client-tests properties::
//!
//! # Benchmarks
//! cargo bench -p light-client-tests
//! ```
//!
//! Set `RUST_LOG=light_client_verify=debug` to see the verifier's logs.

pub mod integration;
pub mod properties;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test log subscriber once per process, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
