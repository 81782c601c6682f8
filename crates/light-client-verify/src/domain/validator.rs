//! # Validator Set and Quorum Verification
//!
//! A [`ValidatorVerifier`] maps validator addresses to their consensus keys
//! and voting power, and decides whether a set of signatures over a digest
//! carries a quorum.
//!
//! Quorum is `floor(2 * total / 3) + 1` (0 for an empty set). Only the
//! address map is serialized; the totals are recomputed when decoding, so a
//! stored or transmitted verifier can never carry a forged quorum.

use super::errors::{VerifyError, VerifyResult};
use super::invariants::PARALLEL_SIGNATURE_THRESHOLD;
use super::value_objects::AccountAddress;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shared_crypto::{
    CryptoHash, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, HashValue,
};
use std::collections::BTreeMap;
use std::fmt;

/// Consensus key and voting power of one validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConsensusInfo {
    /// Ed25519 consensus key.
    pub public_key: Ed25519PublicKey,
    /// Voting power.
    pub voting_power: u64,
}

impl ValidatorConsensusInfo {
    /// Create consensus info.
    pub fn new(public_key: Ed25519PublicKey, voting_power: u64) -> Self {
        Self {
            public_key,
            voting_power,
        }
    }
}

/// Validator set of one epoch with cached quorum.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<AccountAddress, ValidatorConsensusInfo>",
    into = "BTreeMap<AccountAddress, ValidatorConsensusInfo>"
)]
pub struct ValidatorVerifier {
    address_to_validator_info: BTreeMap<AccountAddress, ValidatorConsensusInfo>,
    quorum_voting_power: u128,
    total_voting_power: u128,
}

impl ValidatorVerifier {
    /// Build a verifier; totals are derived from the map.
    pub fn new(address_to_validator_info: BTreeMap<AccountAddress, ValidatorConsensusInfo>) -> Self {
        let total_voting_power: u128 = address_to_validator_info
            .values()
            .map(|info| u128::from(info.voting_power))
            .sum();
        let quorum_voting_power = if address_to_validator_info.is_empty() {
            0
        } else {
            total_voting_power * 2 / 3 + 1
        };
        Self {
            address_to_validator_info,
            quorum_voting_power,
            total_voting_power,
        }
    }

    /// Single validator with voting power 1.
    pub fn new_single(author: AccountAddress, public_key: Ed25519PublicKey) -> Self {
        let mut map = BTreeMap::new();
        map.insert(author, ValidatorConsensusInfo::new(public_key, 1));
        Self::new(map)
    }

    /// Verify one validator's signature over `hash`.
    pub fn verify_signature(
        &self,
        author: AccountAddress,
        hash: &HashValue,
        signature: &Ed25519Signature,
    ) -> VerifyResult<()> {
        let public_key = self
            .get_public_key(&author)
            .ok_or(VerifyError::UnknownAuthor(author))?;
        public_key
            .verify_hash(hash, signature)
            .map_err(|_| VerifyError::InvalidSignature(author))
    }

    /// Verify a signature set over `hash` against the quorum.
    ///
    /// Checks run in a fixed order so the reported error is deterministic:
    /// signature count, unknown authors, voting power, then each signature
    /// in address order.
    pub fn batch_verify_aggregated_signature(
        &self,
        hash: &HashValue,
        signatures: &BTreeMap<AccountAddress, Ed25519Signature>,
    ) -> VerifyResult<()> {
        self.check_num_of_signatures(signatures)?;
        self.check_keys(signatures)?;
        self.check_voting_power(signatures.keys())?;

        if signatures.len() >= PARALLEL_SIGNATURE_THRESHOLD {
            let entries: Vec<(&AccountAddress, &Ed25519Signature)> = signatures.iter().collect();
            let failed = entries
                .par_iter()
                .find_first(|(author, signature)| {
                    self.verify_signature(**author, hash, signature).is_err()
                })
                .map(|(author, _)| **author);
            if let Some(author) = failed {
                tracing::debug!(%author, "signature rejected");
                return Err(VerifyError::InvalidSignature(author));
            }
            return Ok(());
        }

        for (author, signature) in signatures {
            self.verify_signature(*author, hash, signature)?;
        }
        Ok(())
    }

    /// Sign-then-verify shortcut for any hashable record.
    pub fn verify_struct_signatures<T: CryptoHash>(
        &self,
        message: &T,
        signatures: &BTreeMap<AccountAddress, Ed25519Signature>,
    ) -> VerifyResult<()> {
        self.batch_verify_aggregated_signature(&message.hash()?, signatures)
    }

    /// Reject more signatures than validators.
    pub fn check_num_of_signatures(
        &self,
        signatures: &BTreeMap<AccountAddress, Ed25519Signature>,
    ) -> VerifyResult<()> {
        if signatures.len() > self.len() {
            return Err(VerifyError::TooManySignatures {
                num_signatures: signatures.len(),
                num_validators: self.len(),
            });
        }
        Ok(())
    }

    /// Reject any signer outside the set.
    pub fn check_keys(
        &self,
        signatures: &BTreeMap<AccountAddress, Ed25519Signature>,
    ) -> VerifyResult<()> {
        match signatures
            .keys()
            .find(|author| !self.address_to_validator_info.contains_key(author))
        {
            Some(author) => Err(VerifyError::UnknownAuthor(*author)),
            None => Ok(()),
        }
    }

    /// Sum the authors' voting power and require a quorum.
    pub fn check_voting_power<'a>(
        &self,
        authors: impl Iterator<Item = &'a AccountAddress>,
    ) -> VerifyResult<()> {
        let mut aggregated_voting_power: u128 = 0;
        for author in authors {
            let voting_power = self
                .get_voting_power(author)
                .ok_or(VerifyError::UnknownAuthor(*author))?;
            aggregated_voting_power += u128::from(voting_power);
        }

        if aggregated_voting_power < self.quorum_voting_power {
            return Err(VerifyError::TooLittleVotingPower {
                voting_power: aggregated_voting_power,
                quorum_voting_power: self.quorum_voting_power,
            });
        }
        Ok(())
    }

    /// Consensus key of a validator.
    pub fn get_public_key(&self, author: &AccountAddress) -> Option<&Ed25519PublicKey> {
        self.address_to_validator_info
            .get(author)
            .map(|info| &info.public_key)
    }

    /// Voting power of a validator.
    pub fn get_voting_power(&self, author: &AccountAddress) -> Option<u64> {
        self.address_to_validator_info
            .get(author)
            .map(|info| info.voting_power)
    }

    /// Validator addresses in order.
    pub fn get_ordered_account_addresses(&self) -> Vec<AccountAddress> {
        self.address_to_validator_info.keys().copied().collect()
    }

    /// Voting power needed for a quorum.
    pub fn quorum_voting_power(&self) -> u128 {
        self.quorum_voting_power
    }

    /// Voting power of the whole set.
    pub fn total_voting_power(&self) -> u128 {
        self.total_voting_power
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.address_to_validator_info.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.address_to_validator_info.is_empty()
    }
}

impl From<BTreeMap<AccountAddress, ValidatorConsensusInfo>> for ValidatorVerifier {
    fn from(address_to_validator_info: BTreeMap<AccountAddress, ValidatorConsensusInfo>) -> Self {
        Self::new(address_to_validator_info)
    }
}

impl From<ValidatorVerifier> for BTreeMap<AccountAddress, ValidatorConsensusInfo> {
    fn from(verifier: ValidatorVerifier) -> Self {
        verifier.address_to_validator_info
    }
}

impl fmt::Debug for ValidatorVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorVerifier")
            .field("validators", &self.address_to_validator_info.len())
            .field("quorum_voting_power", &self.quorum_voting_power)
            .field("total_voting_power", &self.total_voting_power)
            .finish()
    }
}

impl fmt::Display for ValidatorVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorSet: [")?;
        for (address, info) in &self.address_to_validator_info {
            write!(f, "{}: {}, ", address, info.voting_power)?;
        }
        write!(f, "]")
    }
}

/// A validator's address and signing key.
pub struct ValidatorSigner {
    author: AccountAddress,
    key_pair: Ed25519KeyPair,
}

impl ValidatorSigner {
    /// Signer with an explicit key.
    pub fn new(author: AccountAddress, key_pair: Ed25519KeyPair) -> Self {
        Self { author, key_pair }
    }

    /// Deterministic signer derived from an integer. The key is public
    /// knowledge, so this only exists for tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn from_int(num: u32) -> Self {
        let mut address = [0u8; AccountAddress::LENGTH];
        address[AccountAddress::LENGTH - 4..].copy_from_slice(&num.to_be_bytes());
        let mut seed = [0u8; 32];
        seed[..4].copy_from_slice(&num.to_be_bytes());
        seed[31] = 0xa5;
        Self::new(AccountAddress::new(address), Ed25519KeyPair::from_seed(seed))
    }

    /// Signer with a freshly generated key.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn random(author: AccountAddress) -> Self {
        Self::new(author, Ed25519KeyPair::generate())
    }

    /// Validator address.
    pub fn author(&self) -> AccountAddress {
        self.author
    }

    /// Consensus public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.key_pair.public_key()
    }

    /// Sign a digest.
    pub fn sign_message(&self, hash: &HashValue) -> Ed25519Signature {
        self.key_pair.sign_hash(hash)
    }

    /// Sign the digest of a hashable record.
    pub fn sign<T: CryptoHash>(&self, message: &T) -> VerifyResult<Ed25519Signature> {
        Ok(self.sign_message(&message.hash()?))
    }
}

impl fmt::Debug for ValidatorSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorSigner({})", self.author)
    }
}

/// Deterministic signers and the verifier over them, every validator
/// holding `voting_power`.
#[cfg(any(test, feature = "test-utils"))]
pub fn deterministic_validator_set(
    count: u32,
    voting_power: u64,
) -> (Vec<ValidatorSigner>, ValidatorVerifier) {
    let signers: Vec<ValidatorSigner> = (0..count).map(ValidatorSigner::from_int).collect();
    let map = signers
        .iter()
        .map(|signer| {
            (
                signer.author(),
                ValidatorConsensusInfo::new(signer.public_key(), voting_power),
            )
        })
        .collect();
    (signers, ValidatorVerifier::new(map))
}
