//! # Ledger Verifier Service
//!
//! Authenticates a whole update-to-latest-ledger round trip:
//!
//! 1. The response must not be older than what the client already knows
//! 2. There is one response item per request item, of the matching type
//! 3. Every item verifies against the response's common ledger info
//! 4. The ledger info itself verifies under the client's trust anchor,
//!    walking an epoch change proof first when the anchor is behind
//!
//! Nothing is trusted unless all four hold.

use rayon::prelude::*;
use tracing::{debug, warn};

use super::messages::{RequestItem, ResponseItem, UpdateToLatestLedgerRequest, UpdateToLatestLedgerResponse};
use crate::algorithms::{
    AccountStateWithProof, EventWithProof, TransactionListWithProof, TransactionWithProof, VerifierType,
};
use crate::config::VerifierConfig;
use crate::domain::{
    invariant_fresh_response, AccessPath, AccountAddress, EpochInfo, InMemoryAccumulator, LedgerInfo,
    TransactionAccumulatorHasher, VerifyError, VerifyResult, Version,
};
use crate::ports::{AccountStateReader, LedgerVerifierApi, TrustAnchorStore};

/// Ledger Verifier Service - orchestrates response verification.
pub struct LedgerVerifierService<R: AccountStateReader> {
    /// Configuration.
    config: VerifierConfig,
    /// Decodes account state blobs.
    reader: R,
}

impl<R: AccountStateReader> LedgerVerifierService<R> {
    /// Create a new verifier service. Fails on a config that would
    /// refuse every epoch change.
    pub fn new(config: VerifierConfig, reader: R) -> VerifyResult<Self> {
        config.validate()?;
        Ok(Self { config, reader })
    }

    /// Configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify `response` answers `request` under `trusted`.
    ///
    /// Returns the epoch the client should trust from now on when the
    /// response crossed an epoch boundary, `None` otherwise.
    pub fn verify_update_to_latest_ledger_response(
        &self,
        trusted: &VerifierType,
        request: &UpdateToLatestLedgerRequest,
        response: &UpdateToLatestLedgerResponse,
    ) -> VerifyResult<Option<EpochInfo>> {
        let ledger_info = response.ledger_info_with_sigs.ledger_info();
        self.verify_response(trusted, request, response)
            .inspect(|new_epoch| {
                debug!(
                    version = ledger_info.version(),
                    epoch = ledger_info.epoch(),
                    new_epoch = ?new_epoch.as_ref().map(|info| info.epoch),
                    "[light-client] Response verified"
                );
            })
            .inspect_err(|e| {
                warn!(
                    version = ledger_info.version(),
                    epoch = ledger_info.epoch(),
                    error = %e,
                    "[light-client] Response rejected"
                );
            })
    }

    fn verify_response(
        &self,
        trusted: &VerifierType,
        request: &UpdateToLatestLedgerRequest,
        response: &UpdateToLatestLedgerResponse,
    ) -> VerifyResult<Option<EpochInfo>> {
        let ledger_info_with_sigs = &response.ledger_info_with_sigs;
        let ledger_info = ledger_info_with_sigs.ledger_info();

        invariant_fresh_response(ledger_info.version(), request.client_known_version)?;
        if request.requested_items.len() != response.response_items.len() {
            return Err(VerifyError::RequestResponseMismatch(format!(
                "{} request items but {} response items",
                request.requested_items.len(),
                response.response_items.len()
            )));
        }

        self.verify_response_items(ledger_info, &request.requested_items, &response.response_items)?;

        if !trusted.epoch_change_verification_required(ledger_info.epoch()) {
            trusted.verify(ledger_info_with_sigs)?;
            return Ok(None);
        }

        let epoch_change_proof = &response.epoch_change_proof;
        if epoch_change_proof.len() > self.config.max_epoch_change_proof_len {
            return Err(VerifyError::MalformedProof(format!(
                "epoch change proof has {} ledger infos, at most {} accepted",
                epoch_change_proof.len(),
                self.config.max_epoch_change_proof_len
            )));
        }
        let epoch_change_li = epoch_change_proof.verify(trusted)?.ledger_info();
        let new_epoch_info = epoch_change_li
            .next_epoch_info()
            .ok_or(VerifyError::MissingValidatorSet {
                epoch: epoch_change_li.epoch(),
            })?
            .clone();
        VerifierType::TrustedVerifier(new_epoch_info.clone()).verify(ledger_info_with_sigs)?;
        Ok(Some(new_epoch_info))
    }

    /// Verify items pairwise; the first failure in request order wins.
    fn verify_response_items(
        &self,
        ledger_info: &LedgerInfo,
        requested_items: &[RequestItem],
        response_items: &[ResponseItem],
    ) -> VerifyResult<()> {
        if self.config.parallel_item_verification && requested_items.len() > 1 {
            let results: Vec<VerifyResult<()>> = requested_items
                .par_iter()
                .zip(response_items.par_iter())
                .map(|(request, response)| self.verify_response_item(ledger_info, request, response))
                .collect();
            return results.into_iter().collect();
        }
        requested_items
            .iter()
            .zip(response_items)
            .try_for_each(|(request, response)| self.verify_response_item(ledger_info, request, response))
    }

    /// Verify one item against `ledger_info`.
    pub fn verify_response_item(
        &self,
        ledger_info: &LedgerInfo,
        request: &RequestItem,
        response: &ResponseItem,
    ) -> VerifyResult<()> {
        match (request, response) {
            (
                RequestItem::GetAccountState { address },
                ResponseItem::GetAccountState {
                    account_state_with_proof,
                },
            ) => account_state_with_proof.verify(ledger_info, ledger_info.version(), *address),
            (
                RequestItem::GetAccountTransactionBySequenceNumber {
                    account,
                    sequence_number,
                    fetch_events,
                },
                ResponseItem::GetAccountTransactionBySequenceNumber {
                    transaction_with_proof,
                    proof_of_current_sequence_number,
                },
            ) => self.verify_get_txn_by_seq_num_resp(
                ledger_info,
                *account,
                *sequence_number,
                *fetch_events,
                transaction_with_proof.as_ref(),
                proof_of_current_sequence_number.as_ref(),
            ),
            (
                RequestItem::GetEventsByEventAccessPath {
                    access_path,
                    start_event_seq_num,
                    ascending,
                    limit,
                },
                ResponseItem::GetEventsByEventAccessPath {
                    events_with_proof,
                    proof_of_latest_event,
                },
            ) => self.verify_get_events_by_access_path_resp(
                ledger_info,
                access_path,
                *start_event_seq_num,
                *ascending,
                *limit,
                events_with_proof,
                proof_of_latest_event,
            ),
            (
                RequestItem::GetTransactions {
                    start_version,
                    limit,
                    fetch_events,
                },
                ResponseItem::GetTransactions { txn_list_with_proof },
            ) => verify_get_txns_resp(ledger_info, *start_version, *limit, *fetch_events, txn_list_with_proof),
            (request, response) => Err(VerifyError::RequestResponseMismatch(format!(
                "{} request answered by {} response",
                request.kind(),
                response.kind()
            ))),
        }
    }

    fn verify_get_txn_by_seq_num_resp(
        &self,
        ledger_info: &LedgerInfo,
        account: AccountAddress,
        sequence_number: u64,
        fetch_events: bool,
        transaction_with_proof: Option<&TransactionWithProof>,
        proof_of_current_sequence_number: Option<&AccountStateWithProof>,
    ) -> VerifyResult<()> {
        match (transaction_with_proof, proof_of_current_sequence_number) {
            (Some(transaction_with_proof), None) => {
                if fetch_events != transaction_with_proof.events.is_some() {
                    return Err(VerifyError::RequestResponseMismatch(format!(
                        "events requested: {}, events returned: {}",
                        fetch_events,
                        transaction_with_proof.events.is_some()
                    )));
                }
                transaction_with_proof.verify_user_txn(
                    ledger_info,
                    transaction_with_proof.version,
                    account,
                    sequence_number,
                )
            }
            (None, Some(proof_of_current_sequence_number)) => {
                proof_of_current_sequence_number.verify(ledger_info, ledger_info.version(), account)?;
                let sequence_number_in_ledger = self
                    .reader
                    .sequence_number(proof_of_current_sequence_number.blob.as_ref())?;
                if sequence_number_in_ledger > sequence_number {
                    return Err(VerifyError::RequestResponseMismatch(format!(
                        "no transaction returned for sequence number {} although the account is at {}",
                        sequence_number, sequence_number_in_ledger
                    )));
                }
                Ok(())
            }
            (transaction_with_proof, proof_of_current_sequence_number) => {
                Err(VerifyError::RequestResponseMismatch(format!(
                    "expected exactly one of transaction proof ({}) and sequence number proof ({})",
                    transaction_with_proof.is_some(),
                    proof_of_current_sequence_number.is_some()
                )))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_get_events_by_access_path_resp(
        &self,
        ledger_info: &LedgerInfo,
        access_path: &AccessPath,
        start_event_seq_num: u64,
        ascending: bool,
        limit: u64,
        events_with_proof: &[EventWithProof],
        proof_of_latest_event: &AccountStateWithProof,
    ) -> VerifyResult<()> {
        proof_of_latest_event.verify(ledger_info, ledger_info.version(), access_path.address)?;
        let (event_key, seq_num_upper_bound) =
            proof_of_latest_event.event_key_and_count_by_query_path(&access_path.path, &self.reader)?;

        let window = EventWindow::new(seq_num_upper_bound, start_event_seq_num, ascending, limit);
        if window.count != events_with_proof.len() as u64 {
            return Err(VerifyError::RequestResponseMismatch(format!(
                "expecting {} events, got {}",
                window.count,
                events_with_proof.len()
            )));
        }

        let Some(event_key) = event_key else {
            if events_with_proof.is_empty() {
                return Ok(());
            }
            return Err(VerifyError::RequestResponseMismatch(
                "events returned for a stream that does not exist".to_string(),
            ));
        };
        events_with_proof
            .iter()
            .zip(window.sequence_numbers())
            .try_for_each(|(event_with_proof, sequence_number)| {
                event_with_proof.verify(
                    ledger_info,
                    &event_key,
                    sequence_number,
                    event_with_proof.transaction_version,
                    event_with_proof.event_index,
                )
            })
    }

    /// Grow the client's transaction accumulator to the response's ledger
    /// info using its consistency proof.
    ///
    /// Call only after the response verified.
    pub fn extend_accumulator(
        &self,
        known: &InMemoryAccumulator<TransactionAccumulatorHasher>,
        response: &UpdateToLatestLedgerResponse,
    ) -> VerifyResult<InMemoryAccumulator<TransactionAccumulatorHasher>> {
        let ledger_info = response.ledger_info_with_sigs.ledger_info();
        let new_num_leaves = ledger_info
            .version()
            .checked_add(1)
            .ok_or_else(|| VerifyError::InvalidInput("ledger version overflows".to_string()))?;
        response
            .ledger_consistency_proof
            .verify(known, new_num_leaves, ledger_info.transaction_accumulator_hash())
    }

    /// Load the anchor from `store`, verify, and store the new anchor when an
    /// epoch was crossed. The store is untouched on failure.
    pub async fn sync_with_store<S: TrustAnchorStore + ?Sized>(
        &self,
        store: &S,
        request: &UpdateToLatestLedgerRequest,
        response: &UpdateToLatestLedgerResponse,
    ) -> VerifyResult<Option<EpochInfo>> {
        let trusted = store.load().await?;
        let new_epoch_info = self.verify_update_to_latest_ledger_response(&trusted, request, response)?;
        if let Some(epoch_info) = &new_epoch_info {
            store.store(VerifierType::TrustedVerifier(epoch_info.clone())).await?;
        }
        Ok(new_epoch_info)
    }
}

impl<R: AccountStateReader> LedgerVerifierApi for LedgerVerifierService<R> {
    fn verify_response(
        &self,
        trusted: &VerifierType,
        request: &UpdateToLatestLedgerRequest,
        response: &UpdateToLatestLedgerResponse,
    ) -> VerifyResult<Option<EpochInfo>> {
        self.verify_update_to_latest_ledger_response(trusted, request, response)
    }
}

fn verify_get_txns_resp(
    ledger_info: &LedgerInfo,
    start_version: Version,
    limit: u64,
    fetch_events: bool,
    txn_list_with_proof: &TransactionListWithProof,
) -> VerifyResult<()> {
    if limit == 0 || start_version > ledger_info.version() {
        return txn_list_with_proof.verify(ledger_info, None);
    }
    if fetch_events != txn_list_with_proof.events.is_some() {
        return Err(VerifyError::RequestResponseMismatch(format!(
            "events requested: {}, events returned: {}",
            fetch_events,
            txn_list_with_proof.events.is_some()
        )));
    }
    let expected = limit.min((ledger_info.version() - start_version).saturating_add(1));
    if txn_list_with_proof.len() as u64 != expected {
        return Err(VerifyError::RequestResponseMismatch(format!(
            "expecting {} transactions, got {}",
            expected,
            txn_list_with_proof.len()
        )));
    }
    txn_list_with_proof.verify(ledger_info, Some(start_version))
}

/// Sequence numbers an events response must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct EventWindow {
    cursor: u64,
    count: u64,
    ascending: bool,
}

impl EventWindow {
    /// `u64::MAX` as a descending start means "from the latest event".
    fn new(seq_num_upper_bound: u64, start_event_seq_num: u64, ascending: bool, limit: u64) -> Self {
        let cursor = if !ascending && start_event_seq_num == u64::MAX && seq_num_upper_bound > 0 {
            seq_num_upper_bound - 1
        } else {
            start_event_seq_num
        };
        let count = if cursor >= seq_num_upper_bound {
            0
        } else if ascending {
            limit.min(seq_num_upper_bound - cursor)
        } else {
            limit.min(cursor + 1)
        };
        Self {
            cursor,
            count,
            ascending,
        }
    }

    fn sequence_numbers(self) -> impl Iterator<Item = u64> {
        (0..self.count).map(move |i| {
            if self.ascending {
                self.cursor + i
            } else {
                self.cursor - i
            }
        })
    }
}

/// Sequence numbers a stream with `seq_num_upper_bound` events returns for
/// the query, in response order.
pub fn expected_event_sequence_numbers(
    seq_num_upper_bound: u64,
    start_event_seq_num: u64,
    ascending: bool,
    limit: u64,
) -> Vec<u64> {
    EventWindow::new(seq_num_upper_bound, start_event_seq_num, ascending, limit)
        .sequence_numbers()
        .collect()
}
