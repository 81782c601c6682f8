//! # Quorum and Epoch Change Flows
//!
//! Validator sets hand over to each other through signed epoch-ending
//! ledger infos; a client walks the chain from its trust anchor.

#[cfg(test)]
mod tests {
    use light_client_verify::algorithms::{EpochChangeProof, VerifierType};
    use light_client_verify::domain::{
        BlockInfo, EpochInfo, LedgerInfo, LedgerInfoWithSignatures, ValidatorConsensusInfo,
        ValidatorSigner, ValidatorVerifier, VerifyError, Waypoint,
    };
    use light_client_verify::test_utils::validator_set_for_epoch;
    use shared_crypto::HashValue;
    use std::collections::BTreeMap;

    fn ledger_info(epoch: u64, version: u64, next_epoch_info: Option<EpochInfo>) -> LedgerInfo {
        LedgerInfo::new(
            BlockInfo {
                epoch,
                round: version,
                id: HashValue::new([epoch as u8; 32]),
                executed_state_id: HashValue::new([0x5e; 32]),
                version,
                timestamp_usecs: version * 1_000,
                next_epoch_info,
            },
            HashValue::zero(),
        )
    }

    /// Validator sets for `first..=last`; epoch 6 is large enough to take
    /// the parallel signature path.
    fn sets(first: u64, last: u64) -> BTreeMap<u64, (Vec<ValidatorSigner>, EpochInfo)> {
        (first..=last)
            .map(|epoch| {
                let size = if epoch == 6 { 16 } else { 4 };
                (epoch, validator_set_for_epoch(epoch, size))
            })
            .collect()
    }

    /// Boundaries closing every epoch in `first..last`.
    fn boundaries(
        sets: &BTreeMap<u64, (Vec<ValidatorSigner>, EpochInfo)>,
        first: u64,
        last: u64,
    ) -> Vec<LedgerInfoWithSignatures> {
        (first..last)
            .map(|epoch| {
                let next = sets[&(epoch + 1)].1.clone();
                LedgerInfoWithSignatures::sign_with(ledger_info(epoch, epoch * 100, Some(next)), &sets[&epoch].0)
                    .unwrap()
            })
            .collect()
    }

    // =========================================================================
    // QUORUM
    // =========================================================================

    #[test]
    fn test_quorum_boundary() {
        crate::init_tracing();

        let (signers, epoch_info) = validator_set_for_epoch(1, 4);
        let verifier = &epoch_info.verifier;
        assert_eq!(verifier.total_voting_power(), 4);
        assert_eq!(verifier.quorum_voting_power(), 3);

        let info = ledger_info(1, 10, None);
        let three = LedgerInfoWithSignatures::sign_with(info.clone(), &signers[..3]).unwrap();
        assert!(three.verify_signatures(verifier).is_ok());

        let two = LedgerInfoWithSignatures::sign_with(info, &signers[..2]).unwrap();
        assert_eq!(
            two.verify_signatures(verifier),
            Err(VerifyError::TooLittleVotingPower {
                voting_power: 2,
                quorum_voting_power: 3
            })
        );
    }

    #[test]
    fn test_quorum_with_huge_voting_power() {
        let signers: Vec<ValidatorSigner> = (200..203).map(ValidatorSigner::from_int).collect();
        let verifier = ValidatorVerifier::new(
            signers
                .iter()
                .map(|signer| (signer.author(), ValidatorConsensusInfo::new(signer.public_key(), u64::MAX)))
                .collect(),
        );
        assert_eq!(verifier.total_voting_power(), 3 * u128::from(u64::MAX));

        let info = ledger_info(1, 10, None);
        let all = LedgerInfoWithSignatures::sign_with(info.clone(), &signers).unwrap();
        assert!(all.verify_signatures(&verifier).is_ok());

        let two = LedgerInfoWithSignatures::sign_with(info, &signers[..2]).unwrap();
        assert!(matches!(
            two.verify_signatures(&verifier),
            Err(VerifyError::TooLittleVotingPower { .. })
        ));
    }

    #[test]
    fn test_forged_signature_in_large_set() {
        let (signers, epoch_info) = validator_set_for_epoch(6, 16);
        let info = ledger_info(6, 600, None);
        let mut signed = LedgerInfoWithSignatures::sign_with(info, &signers).unwrap();

        let victim = signers[9].author();
        let forged = signers[0].sign(&ledger_info(6, 601, None)).unwrap();
        signed.add_signature(victim, forged);

        assert_eq!(
            signed.verify_signatures(&epoch_info.verifier),
            Err(VerifyError::InvalidSignature(victim))
        );
    }

    // =========================================================================
    // EPOCH CHANGE
    // =========================================================================

    #[test]
    fn test_epoch_chain_from_trusted_epoch() {
        crate::init_tracing();

        let sets = sets(5, 8);
        let proof = EpochChangeProof::new(boundaries(&sets, 5, 8), false);
        assert_eq!(proof.len(), 3);

        let trusted = VerifierType::TrustedVerifier(sets[&5].1.clone());
        let last = proof.verify(&trusted).unwrap();
        assert_eq!(last.ledger_info().epoch(), 7);
        assert_eq!(last.ledger_info().next_epoch_info(), Some(&sets[&8].1));

        // The new set signs the next ledger info
        let latest = LedgerInfoWithSignatures::sign_with(ledger_info(8, 900, None), &sets[&8].0).unwrap();
        let anchor = VerifierType::TrustedVerifier(sets[&8].1.clone());
        assert!(anchor.verify(&latest).is_ok());
    }

    #[test]
    fn test_epoch_chain_skipping_trusted_epoch_rejected() {
        let sets = sets(5, 8);
        let proof = EpochChangeProof::new(boundaries(&sets, 5, 8), false);

        let trusted = VerifierType::TrustedVerifier(sets[&6].1.clone());
        assert_eq!(
            proof.verify(&trusted),
            Err(VerifyError::EpochMismatch { expected: 6, actual: 5 })
        );
    }

    #[test]
    fn test_empty_epoch_chain_rejected() {
        let sets = sets(5, 5);
        let proof = EpochChangeProof::new(Vec::new(), false);
        let trusted = VerifierType::TrustedVerifier(sets[&5].1.clone());
        assert_eq!(proof.verify(&trusted), Err(VerifyError::EmptyProof));
    }

    #[test]
    fn test_epoch_chain_from_waypoint() {
        let sets = sets(4, 7);
        let chain = boundaries(&sets, 4, 7);
        let waypoint = Waypoint::new_epoch_boundary(chain[0].ledger_info()).unwrap();

        let text = waypoint.to_string();
        let parsed: Waypoint = text.parse().unwrap();
        assert_eq!(parsed, waypoint);

        let proof = EpochChangeProof::new(chain, false);
        let last = proof.verify(&VerifierType::Waypoint(parsed)).unwrap();
        assert_eq!(last.ledger_info().epoch(), 6);
    }

    #[test]
    fn test_old_validators_cannot_sign_new_epoch() {
        let sets = sets(5, 7);
        let mut chain = boundaries(&sets, 5, 7);
        // Epoch 5 validators sign the epoch 6 boundary
        chain[1] = LedgerInfoWithSignatures::sign_with(
            ledger_info(6, 600, Some(sets[&7].1.clone())),
            &sets[&5].0,
        )
        .unwrap();

        let proof = EpochChangeProof::new(chain, false);
        let trusted = VerifierType::TrustedVerifier(sets[&5].1.clone());
        assert!(matches!(
            proof.verify(&trusted),
            Err(VerifyError::TooManySignatures { .. }) | Err(VerifyError::UnknownAuthor(_))
        ));
    }
}
