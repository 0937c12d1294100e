//! Transaction submission and confirmation.
//!
//! Writes fan out to miners; confirmations are read back from sharders under
//! the [`ConfirmationPoller`](crate::poller::ConfirmationPoller). Payload
//! construction and signing happen before these calls and are not done here.

use crate::client::NetworkClient;
use crate::error::{ClientError, Result};
use crate::executor::QuorumResponse;
use crate::replica::ReplicaClass;
use crate::request::{ExecutionRequest, RequiredOutcome};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub const CLIENT_PUT_PATH: &str = "/v1/client/put";
pub const TRANSACTION_PUT_PATH: &str = "/v1/transaction/put";
pub const TRANSACTION_CONFIRMATION_PATH: &str = "/v1/transaction/get/confirmation";
pub const CLIENT_BALANCE_PATH: &str = "/v1/client/get/balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Success,
    Failure,
}

impl TransactionStatus {
    pub fn code(&self) -> i64 {
        match self {
            TransactionStatus::Success => 1,
            TransactionStatus::Failure => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TransactionStatus::Success),
            2 => Some(TransactionStatus::Failure),
            _ => None,
        }
    }
}

/// A signed transaction, ready for submission. Everything but the hash is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A wallet registration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub public_key: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionSubmission {
    #[serde(rename = "async", default)]
    pub is_async: bool,
    pub entity: TransactionEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEntity {
    pub hash: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationResponse {
    pub confirmation: Confirmation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub block_hash: String,
    #[serde(default)]
    pub round: i64,
    pub transaction: ConfirmedTransaction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedTransaction {
    #[serde(default)]
    pub hash: String,
    pub transaction_status: i64,
    #[serde(default)]
    pub transaction_output: String,
}

impl ConfirmedTransaction {
    pub fn status(&self) -> Option<TransactionStatus> {
        TransactionStatus::from_code(self.transaction_status)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    #[serde(default)]
    pub txn: String,
    #[serde(default)]
    pub round: i64,
    pub balance: i64,
    #[serde(default)]
    pub nonce: i64,
}

impl NetworkClient {
    pub async fn register_wallet(&self, wallet: &Wallet) -> Result<QuorumResponse<Value>> {
        let request: ExecutionRequest = ExecutionRequest::post(CLIENT_PUT_PATH)
            .json_body(wallet)?
            .skip_decode();

        let response = self.execute(ReplicaClass::Miner, &request).await?;
        info!("Registered wallet {}", wallet.id);
        Ok(response)
    }

    /// Submits a signed transaction to every healthy miner.
    pub async fn submit_transaction(&self, transaction: &Transaction) -> Result<QuorumResponse<TransactionSubmission>> {
        let request = ExecutionRequest::post(TRANSACTION_PUT_PATH).json_body(transaction)?;

        let response = self.execute(ReplicaClass::Miner, &request).await?;
        info!(
            "Transaction {} accepted by {} miners",
            transaction.hash, response.tally.matched
        );
        Ok(response)
    }

    /// One confirmation fan-out against the sharders: succeeds when the
    /// sharders agree the transaction reached `required`.
    pub async fn check_confirmation(&self, hash: &str, required: TransactionStatus) -> Result<Confirmation> {
        let request = ExecutionRequest::get(TRANSACTION_CONFIRMATION_PATH)
            .query("hash", hash)
            .expect(RequiredOutcome::satisfies(move |r: &ConfirmationResponse| {
                r.confirmation.transaction.transaction_status == required.code()
            }));

        let response = self.execute(ReplicaClass::Sharder, &request).await?;
        response
            .into_value()
            .map(|value| value.confirmation)
            .ok_or(ClientError::EmptyBody {
                class: ReplicaClass::Sharder,
            })
    }

    /// Polls sharders until the transaction reaches `required` or the
    /// confirmation timeout elapses.
    ///
    /// `None` means no confirmation was observed in time. That is not an
    /// error here; callers decide whether it fails their operation.
    pub async fn confirm_transaction(&self, hash: &str, required: TransactionStatus) -> Option<Confirmation> {
        let slot: Mutex<Option<Confirmation>> = Mutex::new(None);
        let observed = &slot;
        let client = self;

        let confirmed = self
            .poller()
            .wait(|| async move {
                match client.check_confirmation(hash, required).await {
                    Ok(confirmation) => {
                        *observed.lock() = Some(confirmation);
                        true
                    }
                    Err(e) => {
                        debug!("Transaction {} not confirmed yet: {}", hash, e);
                        false
                    }
                }
            })
            .await;

        if !confirmed {
            warn!(
                "Transaction {} did not reach {:?} within {:?}",
                hash,
                required,
                self.config().confirmation_timeout
            );
        }
        slot.into_inner()
    }

    /// Submits a transaction and waits for it to reach `required`.
    pub async fn execute_transaction(
        &self,
        transaction: &Transaction,
        required: TransactionStatus,
    ) -> Result<Option<Confirmation>> {
        let submitted = self.submit_transaction(transaction).await?;
        let hash = submitted
            .value()
            .map(|s| s.entity.hash.clone())
            .unwrap_or_else(|| transaction.hash.clone());

        Ok(self.confirm_transaction(&hash, required).await)
    }

    pub async fn get_balance(&self, client_id: &str) -> Result<Balance> {
        let request = ExecutionRequest::get(CLIENT_BALANCE_PATH)
            .query("client_id", client_id)
            .expect(RequiredOutcome::satisfies(|_: &Balance| true));

        let response = self.execute(ReplicaClass::Sharder, &request).await?;
        response.into_value().ok_or(ClientError::EmptyBody {
            class: ReplicaClass::Sharder,
        })
    }
}
