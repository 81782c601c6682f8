//! # Domain Module
//!
//! Ledger types, accumulator positions and the validator set: everything
//! a proof is verified against.

pub mod accumulator;
pub mod errors;
pub mod invariants;
pub mod ledger;
pub mod position;
pub mod transaction;
pub mod validator;
pub mod value_objects;
pub mod waypoint;

pub use accumulator::*;
pub use errors::*;
pub use invariants::*;
pub use ledger::*;
pub use position::*;
pub use transaction::*;
pub use validator::*;
pub use value_objects::*;
pub use waypoint::*;

pub use shared_crypto::HashValue;
