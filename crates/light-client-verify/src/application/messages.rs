//! Request and response records of the update-to-latest-ledger round trip.

use crate::algorithms::{
    AccountStateWithProof, EpochChangeProof, EventWithProof, TransactionAccumulatorConsistencyProof,
    TransactionListWithProof, TransactionWithProof,
};
use crate::domain::{AccessPath, AccountAddress, LedgerInfoWithSignatures, Version};
use serde::{Deserialize, Serialize};

/// One question in a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestItem {
    /// State of one account at the latest version.
    GetAccountState {
        /// Account to read.
        address: AccountAddress,
    },
    /// Transaction sent by `account` with `sequence_number`.
    GetAccountTransactionBySequenceNumber {
        /// Sender.
        account: AccountAddress,
        /// Sender's sequence number.
        sequence_number: u64,
        /// Whether events should be returned too.
        fetch_events: bool,
    },
    /// Window of an event stream.
    GetEventsByEventAccessPath {
        /// Account and query path of the stream.
        access_path: AccessPath,
        /// First sequence number; `u64::MAX` with `ascending == false` means latest.
        start_event_seq_num: u64,
        /// Direction.
        ascending: bool,
        /// Maximum number of events.
        limit: u64,
    },
    /// Consecutive transactions.
    GetTransactions {
        /// First version.
        start_version: Version,
        /// Maximum number of transactions.
        limit: u64,
        /// Whether events should be returned too.
        fetch_events: bool,
    },
}

impl RequestItem {
    /// Short name of the item type.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestItem::GetAccountState { .. } => "get_account_state",
            RequestItem::GetAccountTransactionBySequenceNumber { .. } => {
                "get_account_transaction_by_sequence_number"
            }
            RequestItem::GetEventsByEventAccessPath { .. } => "get_events_by_event_access_path",
            RequestItem::GetTransactions { .. } => "get_transactions",
        }
    }
}

/// One answer in a response, matching the request item at the same index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseItem {
    /// Answer to [`RequestItem::GetAccountState`].
    GetAccountState {
        /// The state and its proof.
        account_state_with_proof: AccountStateWithProof,
    },
    /// Answer to [`RequestItem::GetAccountTransactionBySequenceNumber`]:
    /// exactly one of the two fields is set.
    GetAccountTransactionBySequenceNumber {
        /// The transaction, when committed.
        transaction_with_proof: Option<TransactionWithProof>,
        /// Otherwise, proof that the account has not reached the sequence number.
        proof_of_current_sequence_number: Option<AccountStateWithProof>,
    },
    /// Answer to [`RequestItem::GetEventsByEventAccessPath`].
    GetEventsByEventAccessPath {
        /// The events.
        events_with_proof: Vec<EventWithProof>,
        /// Proof of the account state holding the stream's handle.
        proof_of_latest_event: AccountStateWithProof,
    },
    /// Answer to [`RequestItem::GetTransactions`].
    GetTransactions {
        /// The transactions.
        txn_list_with_proof: TransactionListWithProof,
    },
}

impl ResponseItem {
    /// Short name of the item type, equal to the matching request's.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseItem::GetAccountState { .. } => "get_account_state",
            ResponseItem::GetAccountTransactionBySequenceNumber { .. } => {
                "get_account_transaction_by_sequence_number"
            }
            ResponseItem::GetEventsByEventAccessPath { .. } => "get_events_by_event_access_path",
            ResponseItem::GetTransactions { .. } => "get_transactions",
        }
    }
}

/// What a client asks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateToLatestLedgerRequest {
    /// Latest version the client has already verified.
    pub client_known_version: Version,
    /// Questions, answered in order.
    pub requested_items: Vec<RequestItem>,
}

impl UpdateToLatestLedgerRequest {
    /// Create a request.
    pub fn new(client_known_version: Version, requested_items: Vec<RequestItem>) -> Self {
        Self {
            client_known_version,
            requested_items,
        }
    }
}

/// What a server answers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateToLatestLedgerResponse {
    /// Answers, one per request item.
    pub response_items: Vec<ResponseItem>,
    /// Latest ledger info every answer is proven against.
    pub ledger_info_with_sigs: LedgerInfoWithSignatures,
    /// Epoch boundaries since the client's trusted epoch.
    pub epoch_change_proof: EpochChangeProof,
    /// Growth of the transaction accumulator since `client_known_version`.
    pub ledger_consistency_proof: TransactionAccumulatorConsistencyProof,
}

impl UpdateToLatestLedgerResponse {
    /// Response without epoch changes or consistency proof.
    pub fn new(response_items: Vec<ResponseItem>, ledger_info_with_sigs: LedgerInfoWithSignatures) -> Self {
        Self {
            response_items,
            ledger_info_with_sigs,
            epoch_change_proof: EpochChangeProof::new(Vec::new(), false),
            ledger_consistency_proof: TransactionAccumulatorConsistencyProof::new(Vec::new()),
        }
    }
}
