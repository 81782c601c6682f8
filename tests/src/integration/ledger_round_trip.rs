//! # Ledger Round Trip
//!
//! A client bootstraps from the genesis waypoint, follows the ledger
//! across reconfigurations, and rejects tampered answers.

#[cfg(test)]
mod tests {
    use light_client_verify::adapters::{account_sent_event_path, CanonicalAccountStateReader, InMemoryTrustAnchorStore};
    use light_client_verify::algorithms::VerifierType;
    use light_client_verify::application::{
        LedgerVerifierService, RequestItem, ResponseItem, UpdateToLatestLedgerRequest,
    };
    use light_client_verify::config::VerifierConfig;
    use light_client_verify::domain::{
        AccessPath, AccountAddress, InMemoryAccumulator, TransactionAccumulatorHasher, VerifyError,
    };
    use light_client_verify::ports::{LedgerVerifierApi, TrustAnchorStore};
    use light_client_verify::test_utils::MockLedger;

    fn alice() -> AccountAddress {
        AccountAddress::new([0xa1; AccountAddress::LENGTH])
    }

    fn bob() -> AccountAddress {
        AccountAddress::new([0xb0; AccountAddress::LENGTH])
    }

    fn service() -> LedgerVerifierService<CanonicalAccountStateReader> {
        LedgerVerifierService::new(VerifierConfig::default(), CanonicalAccountStateReader).unwrap()
    }

    fn everything_about(account: AccountAddress, known_version: u64) -> UpdateToLatestLedgerRequest {
        UpdateToLatestLedgerRequest::new(
            known_version,
            vec![
                RequestItem::GetAccountState { address: account },
                RequestItem::GetAccountTransactionBySequenceNumber {
                    account,
                    sequence_number: 0,
                    fetch_events: true,
                },
                RequestItem::GetEventsByEventAccessPath {
                    access_path: AccessPath::new(account, account_sent_event_path()),
                    start_event_seq_num: u64::MAX,
                    ascending: false,
                    limit: 10,
                },
                RequestItem::GetTransactions {
                    start_version: known_version,
                    limit: 100,
                    fetch_events: true,
                },
            ],
        )
    }

    #[tokio::test]
    async fn test_client_follows_ledger_across_epochs() {
        crate::init_tracing();

        let mut ledger = MockLedger::new(4).unwrap();
        for _ in 0..3 {
            ledger.submit(alice()).unwrap();
        }

        let store = InMemoryTrustAnchorStore::new(VerifierType::Waypoint(ledger.genesis_waypoint().unwrap()));
        let service = service();
        let mut accumulator =
            InMemoryAccumulator::<TransactionAccumulatorHasher>::from_leaves(&ledger.accumulator().leaves()[..1]);

        // Bootstrap: the waypoint approves the genesis boundary
        let request = everything_about(alice(), 0);
        let response = ledger.respond(&request, None).unwrap();
        let new_epoch = service.sync_with_store(&store, &request, &response).await.unwrap();
        assert_eq!(new_epoch.map(|info| info.epoch), Some(1));
        assert_eq!(store.current().epoch(), Some(1));
        accumulator = service.extend_accumulator(&accumulator, &response).unwrap();
        assert_eq!(accumulator.root_hash(), ledger.accumulator().root_hash());
        let mut known_version = ledger.version();

        // Two reconfigurations with changing validator counts
        for (round, validators) in [(0u64, 7usize), (1, 3)] {
            ledger.reconfigure(validators).unwrap();
            ledger.submit(bob()).unwrap();
            ledger.submit(alice()).unwrap();

            let request = everything_about(bob(), known_version);
            let trusted_epoch = store.load().await.unwrap().epoch();
            let response = ledger.respond(&request, trusted_epoch).unwrap();
            assert_eq!(response.epoch_change_proof.len(), 1);

            let new_epoch = service.sync_with_store(&store, &request, &response).await.unwrap();
            assert_eq!(new_epoch.map(|info| info.epoch), Some(2 + round));

            accumulator = service.extend_accumulator(&accumulator, &response).unwrap();
            assert_eq!(accumulator.root_hash(), ledger.accumulator().root_hash());
            known_version = ledger.version();
        }
        assert_eq!(store.current().epoch(), Some(ledger.epoch()));

        // Same epoch: nothing new to trust
        ledger.submit(alice()).unwrap();
        let request = everything_about(alice(), known_version);
        let response = ledger.respond(&request, Some(ledger.epoch())).unwrap();
        assert_eq!(service.sync_with_store(&store, &request, &response).await, Ok(None));
    }

    #[test]
    fn test_verifier_behind_trait_object() {
        let mut ledger = MockLedger::new(4).unwrap();
        ledger.submit(alice()).unwrap();
        ledger.submit(bob()).unwrap();

        let api: Box<dyn LedgerVerifierApi> = Box::new(service());
        let request = everything_about(alice(), 0);
        let response = ledger.respond(&request, Some(1)).unwrap();
        assert_eq!(api.verify_response(&ledger.trusted_verifier(), &request, &response), Ok(None));
    }

    #[test]
    fn test_stale_anchor_without_epoch_proof_rejected() {
        let mut ledger = MockLedger::new(4).unwrap();
        ledger.submit(alice()).unwrap();
        let old_anchor = ledger.trusted_verifier();
        ledger.reconfigure(4).unwrap();

        let request = everything_about(alice(), 0);
        let mut response = ledger.respond(&request, Some(1)).unwrap();
        response.epoch_change_proof.ledger_info_with_sigs.clear();
        assert_eq!(
            service().verify_response(&old_anchor, &request, &response),
            Err(VerifyError::EmptyProof)
        );
    }

    #[test]
    fn test_missing_signatures_rejected() {
        let mut ledger = MockLedger::new(4).unwrap();
        ledger.submit(alice()).unwrap();

        let request = everything_about(alice(), 0);
        let mut response = ledger.respond(&request, Some(1)).unwrap();
        for signer in &ledger.signers()[..2] {
            response.ledger_info_with_sigs.remove_signature(&signer.author());
        }
        assert!(matches!(
            service().verify_response(&ledger.trusted_verifier(), &request, &response),
            Err(VerifyError::TooLittleVotingPower { .. })
        ));
    }

    #[test]
    fn test_tampered_event_rejected() {
        let mut ledger = MockLedger::new(4).unwrap();
        ledger.submit(alice()).unwrap();
        ledger.submit(alice()).unwrap();

        let request = everything_about(alice(), 0);
        let mut response = ledger.respond(&request, Some(1)).unwrap();
        match &mut response.response_items[2] {
            ResponseItem::GetEventsByEventAccessPath { events_with_proof, .. } => {
                events_with_proof[0].event.event_data = b"forged".to_vec();
            }
            other => panic!("unexpected item {}", other.kind()),
        }
        assert!(service()
            .verify_response(&ledger.trusted_verifier(), &request, &response)
            .is_err());
    }

    #[test]
    fn test_tampered_transaction_list_rejected() {
        let mut ledger = MockLedger::new(4).unwrap();
        ledger.submit(alice()).unwrap();
        ledger.submit(bob()).unwrap();

        let request = everything_about(alice(), 0);
        let mut response = ledger.respond(&request, Some(1)).unwrap();
        match &mut response.response_items[3] {
            ResponseItem::GetTransactions { txn_list_with_proof } => {
                txn_list_with_proof.transactions.swap(1, 2);
            }
            other => panic!("unexpected item {}", other.kind()),
        }
        assert!(service()
            .verify_response(&ledger.trusted_verifier(), &request, &response)
            .is_err());
    }
}
