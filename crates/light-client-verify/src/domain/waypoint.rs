//! # Waypoints
//!
//! A waypoint is an off-chain trust anchor: the version and hash of the
//! ledger info that closes some epoch. A client bootstrapping from a
//! waypoint accepts exactly that ledger info, whoever signed it, and from
//! then on trusts the validator set it carries.
//!
//! Only fields every honest node agrees on are hashed (consensus-specific
//! fields such as the block id and round are left out).

use super::errors::{VerifyError, VerifyResult};
use super::ledger::{EpochInfo, LedgerInfo};
use super::value_objects::Version;
use serde::{Deserialize, Serialize};
use shared_crypto::{canonical_hash, CryptoError, CryptoHash, HashDomain, HashValue};
use std::fmt;
use std::str::FromStr;

/// Separator between version and hash in the text form.
const WAYPOINT_DELIMITER: char = ':';

/// Trusted `(version, hash)` of an epoch-ending ledger info.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Waypoint {
    /// Version of the reconfiguration the waypoint approves.
    version: Version,
    /// Hash of the waypoint-relevant ledger info fields.
    value: HashValue,
}

impl Waypoint {
    /// Waypoint for an epoch-ending ledger info.
    pub fn new_epoch_boundary(ledger_info: &LedgerInfo) -> VerifyResult<Self> {
        let converter = Ledger2WaypointConverter::new(ledger_info)?;
        Ok(Self {
            version: ledger_info.version(),
            value: converter.hash()?,
        })
    }

    /// Approved version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Approved hash.
    pub fn value(&self) -> HashValue {
        self.value
    }

    /// Accept `ledger_info` only if it is the one this waypoint approves.
    pub fn verify(&self, ledger_info: &LedgerInfo) -> VerifyResult<()> {
        if ledger_info.version() != self.version {
            return Err(VerifyError::WaypointMismatch(format!(
                "waypoint version {} does not match ledger info version {}",
                self.version,
                ledger_info.version()
            )));
        }
        let converter = Ledger2WaypointConverter::new(ledger_info)?;
        let actual = converter.hash()?;
        if actual != self.value {
            return Err(VerifyError::WaypointMismatch(format!(
                "waypoint value {} does not match ledger info value {}",
                self.value, actual
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.version, WAYPOINT_DELIMITER, self.value)
    }
}

impl fmt::Debug for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Waypoint({})", self)
    }
}

impl FromStr for Waypoint {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, value) = s.split_once(WAYPOINT_DELIMITER).ok_or_else(|| {
            VerifyError::InvalidInput(format!("waypoint {:?} is not <version>:<hash>", s))
        })?;
        let version = version
            .parse::<Version>()
            .map_err(|e| VerifyError::InvalidInput(format!("waypoint version: {}", e)))?;
        let value = value.parse::<HashValue>()?;
        Ok(Self { version, value })
    }
}

/// Fields of a ledger info that a waypoint commits to.
#[derive(Serialize)]
struct Ledger2WaypointConverter<'a> {
    epoch: u64,
    root_hash: HashValue,
    version: Version,
    timestamp_usecs: u64,
    next_epoch_info: &'a EpochInfo,
}

impl<'a> Ledger2WaypointConverter<'a> {
    fn new(ledger_info: &'a LedgerInfo) -> VerifyResult<Self> {
        let next_epoch_info = ledger_info
            .next_epoch_info()
            .ok_or(VerifyError::MissingValidatorSet {
                epoch: ledger_info.epoch(),
            })?;
        Ok(Self {
            epoch: ledger_info.epoch(),
            root_hash: ledger_info.transaction_accumulator_hash(),
            version: ledger_info.version(),
            timestamp_usecs: ledger_info.timestamp_usecs(),
            next_epoch_info,
        })
    }
}

impl CryptoHash for Ledger2WaypointConverter<'_> {
    fn hash(&self) -> Result<HashValue, CryptoError> {
        canonical_hash(HashDomain::Waypoint, self)
    }
}
