//! Error taxonomy for the custody backend.
//!
//! Every component has its own error enum; [`WalletError`] is the closed set
//! of outcomes surfaced to callers of the transaction service and the
//! listener coordinator. Callers branch on the variant, never on the message.

use thiserror::Error;

use crate::db::StoreError;
use crate::flow::{Identifier, LedgerError};
use crate::jobs::PoolError;
use crate::keys::KeyError;

#[derive(Debug, Error)]
pub enum WalletError {
    /// Bad address, id or argument. Rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Job pool backlog is full. Nothing was scheduled.
    #[error("max capacity reached, try again later")]
    Capacity,

    /// Key custody could not produce an authorizer. Nothing left this service.
    #[error("authorizer unavailable: {0}")]
    KeyCustody(#[from] KeyError),

    /// The ledger refused or never received the transaction.
    /// No identifier was assigned and no record was written.
    #[error("transaction submission failed: {0}")]
    Submission(#[source] LedgerError),

    /// The transaction is live on the ledger and recorded as submitted, but
    /// sealing could not be observed or the chain reported an execution error.
    #[error("transaction {transaction_id} did not finalize: {reason}")]
    Finality {
        transaction_id: Identifier,
        reason: String,
    },

    /// Storage failed. When `transaction_id` is set the transaction already
    /// reached the ledger and the local record may be missing or stale.
    #[error("{}", persistence_message(.transaction_id, .source))]
    Persistence {
        transaction_id: Option<Identifier>,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    NotFound(String),

    /// Another replica holds the listener status lock.
    #[error("listener status is locked by another replica")]
    LockContention,

    #[error("internal error: {0}")]
    Internal(String),
}

fn persistence_message(transaction_id: &Option<Identifier>, source: &StoreError) -> String {
    match transaction_id {
        Some(id) => format!("transaction {} sent but not recorded: {}", id, source),
        None => format!("storage error: {}", source),
    }
}

impl WalletError {
    /// True when the ledger saw the transaction, so the failure needs
    /// reconciliation rather than a blind retry.
    pub fn ledger_side_effect(&self) -> bool {
        match self {
            WalletError::Finality { .. } => true,
            WalletError::Persistence { transaction_id, .. } => transaction_id.is_some(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            WalletError::Validation(_) => 400,
            WalletError::NotFound(_) => 404,
            WalletError::LockContention => 409,
            WalletError::Capacity => 503,
            _ => 500,
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(source: StoreError) -> Self {
        match source {
            StoreError::NotFound => WalletError::NotFound("record not found".to_string()),
            source => WalletError::Persistence {
                transaction_id: None,
                source,
            },
        }
    }
}

impl From<PoolError> for WalletError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::QueueFull { capacity } => {
                log::warn!("[JobPool] Rejected job, backlog of {} is full", capacity);
                WalletError::Capacity
            }
            PoolError::ShutDown => WalletError::Internal(err.to_string()),
        }
    }
}
