//! Test utilities for the ledger verifier.
//!
//! [`MockLedger`] is an honest in-memory server: it commits transactions,
//! rotates validator sets, and answers requests with proofs. Tests tamper
//! with its answers to exercise the verifier's failure paths.
//! Enable with the `test-utils` feature flag.

use crate::adapters::{AccountResource, AccountState};
use crate::algorithms::{
    event_root_hash, AccountStateProof, AccountStateWithProof, EpochChangeProof, EventProof,
    EventWithProof, MerkleAccumulator, SparseMerkleTree, TransactionListProof,
    TransactionListWithProof, TransactionProof, TransactionWithProof, VerifierType,
};
use crate::application::{
    expected_event_sequence_numbers, RequestItem, ResponseItem, UpdateToLatestLedgerRequest,
    UpdateToLatestLedgerResponse,
};
use crate::domain::{
    AccountAddress, AccountStateBlob, BlockInfo, ContractEvent, EpochInfo, EventAccumulatorHasher,
    EventHandle, EventKey, LedgerInfo, LedgerInfoWithSignatures, SignedTransaction, Transaction,
    TransactionAccumulatorHasher, TransactionInfo, ValidatorConsensusInfo, ValidatorSigner,
    ValidatorVerifier, VerifyError, VerifyResult, Version, Waypoint,
};
use shared_crypto::{CryptoHash, HashValue};
use std::collections::BTreeMap;

/// Largest validator set [`validator_set_for_epoch`] hands out.
pub const MAX_VALIDATORS_PER_EPOCH: usize = 1 << 16;

/// Validators of `epoch`, distinct from every other epoch's below 2^16.
pub fn validator_set_for_epoch(epoch: u64, count: usize) -> (Vec<ValidatorSigner>, EpochInfo) {
    assert!(count <= MAX_VALIDATORS_PER_EPOCH, "at most {} validators per epoch", MAX_VALIDATORS_PER_EPOCH);
    let base = (epoch as u32) << 16;
    let signers: Vec<ValidatorSigner> = (0..count as u32)
        .map(|i| ValidatorSigner::from_int(base | i))
        .collect();
    let verifier = ValidatorVerifier::new(
        signers
            .iter()
            .map(|signer| (signer.author(), ValidatorConsensusInfo::new(signer.public_key(), 1)))
            .collect(),
    );
    (signers, EpochInfo::new(epoch, verifier))
}

/// Honest in-memory ledger that serves proofs.
pub struct MockLedger {
    transactions: Vec<Transaction>,
    events: Vec<Vec<ContractEvent>>,
    infos: Vec<TransactionInfo>,
    accumulator: MerkleAccumulator<TransactionAccumulatorHasher>,
    state: SparseMerkleTree,
    accounts: BTreeMap<AccountAddress, AccountResource>,
    sent: BTreeMap<(AccountAddress, u64), Version>,
    event_locations: BTreeMap<EventKey, Vec<(Version, u64)>>,
    /// Signers and validator set per epoch, indexed by epoch.
    epochs: Vec<(Vec<ValidatorSigner>, EpochInfo)>,
    boundaries: Vec<LedgerInfoWithSignatures>,
}

impl MockLedger {
    /// Genesis (version 0) closes epoch 0; the ledger is then in epoch 1
    /// with `num_validators` validators.
    pub fn new(num_validators: usize) -> VerifyResult<Self> {
        let mut ledger = Self {
            transactions: Vec::new(),
            events: Vec::new(),
            infos: Vec::new(),
            accumulator: MerkleAccumulator::new(Vec::new()),
            state: SparseMerkleTree::new(),
            accounts: BTreeMap::new(),
            sent: BTreeMap::new(),
            event_locations: BTreeMap::new(),
            epochs: vec![validator_set_for_epoch(0, num_validators)],
            boundaries: Vec::new(),
        };
        ledger.reconfigure(num_validators)?;
        Ok(ledger)
    }

    /// Latest version.
    pub fn version(&self) -> Version {
        self.accumulator.num_leaves().saturating_sub(1)
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epochs.len() as u64 - 1
    }

    /// Transaction accumulator.
    pub fn accumulator(&self) -> &MerkleAccumulator<TransactionAccumulatorHasher> {
        &self.accumulator
    }

    /// Waypoint of the genesis boundary.
    pub fn genesis_waypoint(&self) -> VerifyResult<Waypoint> {
        let genesis = self.boundaries.first().ok_or(VerifyError::EmptyProof)?;
        Waypoint::new_epoch_boundary(genesis.ledger_info())
    }

    /// Anchor trusting the current epoch.
    pub fn trusted_verifier(&self) -> VerifierType {
        VerifierType::TrustedVerifier(self.epochs[self.epochs.len() - 1].1.clone())
    }

    /// Anchor trusting `epoch`.
    pub fn trusted_verifier_at(&self, epoch: u64) -> VerifyResult<VerifierType> {
        self.epochs
            .get(epoch as usize)
            .map(|(_, info)| VerifierType::TrustedVerifier(info.clone()))
            .ok_or(VerifyError::EpochMismatch {
                expected: epoch,
                actual: self.epoch(),
            })
    }

    /// Signers of the current epoch.
    pub fn signers(&self) -> &[ValidatorSigner] {
        &self.epochs[self.epochs.len() - 1].0
    }

    fn commit(&mut self, transaction: Transaction, events: Vec<ContractEvent>) -> VerifyResult<Version> {
        let version = self.transactions.len() as Version;
        for (index, event) in events.iter().enumerate() {
            self.event_locations
                .entry(event.key)
                .or_default()
                .push((version, index as u64));
        }
        let info = TransactionInfo::new(
            transaction.hash()?,
            self.state.root_hash(),
            event_root_hash(&events)?,
            1,
            0,
        );
        self.accumulator.append(&[info.hash()?]);
        self.transactions.push(transaction);
        self.events.push(events);
        self.infos.push(info);
        Ok(version)
    }

    /// Commit the next payment sent by `sender`, creating the account on
    /// first use.
    pub fn submit(&mut self, sender: AccountAddress) -> VerifyResult<Version> {
        let resource = self.accounts.entry(sender).or_insert_with(|| AccountResource {
            authentication_key: sender.as_bytes().to_vec(),
            received_events: Some(EventHandle::new(EventKey::new_from_address(&sender, 0), 0)),
            sent_events: Some(EventHandle::new(EventKey::new_from_address(&sender, 1), 0)),
            sequence_number: 0,
            is_frozen: false,
        });
        let sequence_number = resource.sequence_number;
        resource.sequence_number += 1;
        let sent = resource
            .sent_events
            .get_or_insert_with(|| EventHandle::new(EventKey::new_from_address(&sender, 1), 0));
        let event = ContractEvent::new(
            sent.key,
            sent.count,
            "SentPaymentEvent".to_string(),
            sequence_number.to_le_bytes().to_vec(),
        );
        sent.count += 1;

        let blob = Self::blob_of(resource)?;
        self.state.insert(sender.hash()?, blob.hash()?);

        let transaction = Transaction::UserTransaction(SignedTransaction {
            sender,
            sequence_number,
            payload: vec![0xca, 0xfe],
            max_gas_amount: 1_000_000,
            gas_unit_price: 0,
            expiration_timestamp_secs: u64::MAX,
        });
        let version = self.commit(transaction, vec![event])?;
        self.sent.insert((sender, sequence_number), version);
        Ok(version)
    }

    /// Close the current epoch with a write set and hand over to
    /// `num_validators` fresh validators.
    pub fn reconfigure(&mut self, num_validators: usize) -> VerifyResult<()> {
        let next_epoch = self.epochs.len() as u64;
        let version = self.commit(Transaction::WriteSet(next_epoch.to_le_bytes().to_vec()), Vec::new())?;
        let (signers, next_epoch_info) = validator_set_for_epoch(next_epoch, num_validators);
        let ledger_info = self.ledger_info(next_epoch - 1, version, Some(next_epoch_info.clone()));
        let boundary = LedgerInfoWithSignatures::sign_with(ledger_info, self.signers())?;
        self.boundaries.push(boundary);
        self.epochs.push((signers, next_epoch_info));
        Ok(())
    }

    fn ledger_info(&self, epoch: u64, version: Version, next_epoch_info: Option<EpochInfo>) -> LedgerInfo {
        LedgerInfo::new(
            BlockInfo {
                epoch,
                round: version,
                id: HashValue::new([epoch as u8; 32]),
                executed_state_id: self.accumulator.root_hash(),
                version,
                timestamp_usecs: version * 1_000_000,
                next_epoch_info,
            },
            HashValue::zero(),
        )
    }

    /// Latest ledger info signed by the current validators.
    pub fn ledger_info_with_sigs(&self) -> VerifyResult<LedgerInfoWithSignatures> {
        let ledger_info = self.ledger_info(self.epoch(), self.version(), None);
        LedgerInfoWithSignatures::sign_with(ledger_info, self.signers())
    }

    /// Boundaries from `from_epoch` on; every boundary when `None`.
    pub fn epoch_change_proof(&self, from_epoch: Option<u64>) -> EpochChangeProof {
        let from_epoch = from_epoch.unwrap_or(0);
        EpochChangeProof::new(
            self.boundaries
                .iter()
                .filter(|boundary| boundary.ledger_info().epoch() >= from_epoch)
                .cloned()
                .collect(),
            false,
        )
    }

    fn blob_of(resource: &AccountResource) -> VerifyResult<AccountStateBlob> {
        let mut state = AccountState::default();
        state.set_account_resource(resource)?;
        state.to_blob()
    }

    fn info(&self, version: Version) -> VerifyResult<&TransactionInfo> {
        self.infos
            .get(version as usize)
            .ok_or(VerifyError::VersionTooNew {
                version,
                ledger_version: self.version(),
            })
    }

    /// State of `address` at the latest version.
    pub fn account_state_with_proof(&self, address: AccountAddress) -> VerifyResult<AccountStateWithProof> {
        let version = self.version();
        let blob = self.accounts.get(&address).map(Self::blob_of).transpose()?;
        let proof = AccountStateProof::new(
            self.accumulator.get_proof(version)?,
            self.info(version)?.clone(),
            self.state.get_proof(&address.hash()?),
        );
        Ok(AccountStateWithProof::new(version, blob, proof))
    }

    /// Transaction at `version`.
    pub fn transaction_with_proof(&self, version: Version, fetch_events: bool) -> VerifyResult<TransactionWithProof> {
        let info = self.info(version)?.clone();
        let index = version as usize;
        Ok(TransactionWithProof::new(
            version,
            self.transactions[index].clone(),
            fetch_events.then(|| self.events[index].clone()),
            TransactionProof::new(self.accumulator.get_proof(version)?, info),
        ))
    }

    /// Event `event_index` of the transaction at `version`.
    pub fn event_with_proof(&self, version: Version, event_index: u64) -> VerifyResult<EventWithProof> {
        let info = self.info(version)?.clone();
        let events = &self.events[version as usize];
        let event = events
            .get(event_index as usize)
            .cloned()
            .ok_or_else(|| VerifyError::InvalidInput(format!("no event {} at version {}", event_index, version)))?;
        let hashes = events
            .iter()
            .map(CryptoHash::hash)
            .collect::<Result<Vec<_>, _>>()?;
        let event_tree = MerkleAccumulator::<EventAccumulatorHasher>::new(hashes);
        Ok(EventWithProof::new(
            version,
            event_index,
            event,
            EventProof::new(self.accumulator.get_proof(version)?, info, event_tree.get_proof(event_index)?),
        ))
    }

    /// Up to `limit` transactions from `start_version`.
    pub fn transaction_list_with_proof(
        &self,
        start_version: Version,
        limit: u64,
        fetch_events: bool,
    ) -> VerifyResult<TransactionListWithProof> {
        if limit == 0 || start_version > self.version() {
            return Ok(TransactionListWithProof::new_empty());
        }
        let count = limit.min(self.version() - start_version + 1);
        let range = start_version as usize..(start_version + count) as usize;
        Ok(TransactionListWithProof::new(
            self.transactions[range.clone()].to_vec(),
            fetch_events.then(|| self.events[range.clone()].to_vec()),
            Some(start_version),
            TransactionListProof::new(
                self.accumulator.get_range_proof(Some(start_version), count)?,
                self.infos[range].to_vec(),
            ),
        ))
    }

    fn respond_item(&self, item: &RequestItem) -> VerifyResult<ResponseItem> {
        Ok(match item {
            RequestItem::GetAccountState { address } => ResponseItem::GetAccountState {
                account_state_with_proof: self.account_state_with_proof(*address)?,
            },
            RequestItem::GetAccountTransactionBySequenceNumber {
                account,
                sequence_number,
                fetch_events,
            } => match self.sent.get(&(*account, *sequence_number)) {
                Some(version) => ResponseItem::GetAccountTransactionBySequenceNumber {
                    transaction_with_proof: Some(self.transaction_with_proof(*version, *fetch_events)?),
                    proof_of_current_sequence_number: None,
                },
                None => ResponseItem::GetAccountTransactionBySequenceNumber {
                    transaction_with_proof: None,
                    proof_of_current_sequence_number: Some(self.account_state_with_proof(*account)?),
                },
            },
            RequestItem::GetEventsByEventAccessPath {
                access_path,
                start_event_seq_num,
                ascending,
                limit,
            } => {
                let handle = match self.accounts.get(&access_path.address) {
                    Some(resource) => resource.event_handle_by_query_path(&access_path.path)?,
                    None => None,
                };
                let events_with_proof = match handle {
                    Some(handle) => {
                        let locations = self.event_locations.get(&handle.key).map(Vec::as_slice).unwrap_or(&[]);
                        expected_event_sequence_numbers(handle.count, *start_event_seq_num, *ascending, *limit)
                            .into_iter()
                            .map(|sequence_number| {
                                let (version, index) = locations.get(sequence_number as usize).copied().ok_or_else(
                                    || VerifyError::InvalidInput(format!("no event {}", sequence_number)),
                                )?;
                                self.event_with_proof(version, index)
                            })
                            .collect::<VerifyResult<Vec<_>>>()?
                    }
                    None => Vec::new(),
                };
                ResponseItem::GetEventsByEventAccessPath {
                    events_with_proof,
                    proof_of_latest_event: self.account_state_with_proof(access_path.address)?,
                }
            }
            RequestItem::GetTransactions {
                start_version,
                limit,
                fetch_events,
            } => ResponseItem::GetTransactions {
                txn_list_with_proof: self.transaction_list_with_proof(*start_version, *limit, *fetch_events)?,
            },
        })
    }

    /// Answer `request` for a client trusting `trusted_epoch` (`None` for a
    /// client bootstrapping from the genesis waypoint).
    pub fn respond(
        &self,
        request: &UpdateToLatestLedgerRequest,
        trusted_epoch: Option<u64>,
    ) -> VerifyResult<UpdateToLatestLedgerResponse> {
        let response_items = request
            .requested_items
            .iter()
            .map(|item| self.respond_item(item))
            .collect::<VerifyResult<Vec<_>>>()?;
        let known_leaves = request
            .client_known_version
            .saturating_add(1)
            .min(self.accumulator.num_leaves());
        Ok(UpdateToLatestLedgerResponse {
            response_items,
            ledger_info_with_sigs: self.ledger_info_with_sigs()?,
            epoch_change_proof: self.epoch_change_proof(trusted_epoch),
            ledger_consistency_proof: self.accumulator.get_consistency_proof(known_leaves)?,
        })
    }
}
