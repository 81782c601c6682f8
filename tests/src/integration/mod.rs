//! # Integration Flows
//!
//! Server-side builders paired with client-side verifiers.

pub mod accumulator_flows;
pub mod epoch_flows;
pub mod ledger_round_trip;
