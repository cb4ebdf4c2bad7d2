//! Ledger collaborator interfaces.
//!
//! [`LedgerClient`] is what the transaction manager drives; [`ChainReader`]
//! is the read-only side used by the chain events listener.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Identifier;
use crate::keys::Authorizer;
use crate::transactions::Transaction;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("access API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("timed out waiting for the ledger")]
    Timeout,

    #[error("failed to decode ledger response: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Signing roles for one submission.
#[derive(Debug, Clone)]
pub struct Signatories {
    pub proposer: Authorizer,
    pub payer: Authorizer,
    pub authorizers: Vec<Authorizer>,
}

/// Outcome reported by the ledger once a transaction is sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub status: String,
    /// Set when the transaction was sealed but its execution failed.
    pub error_message: Option<String>,
}

impl TransactionResult {
    pub fn sealed() -> Self {
        Self {
            status: "Sealed".to_string(),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "Sealed".to_string(),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id: Identifier,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Fully qualified type, e.g. `A.0ae53cb6e3f42a79.FlowToken.TokensDeposited`.
    pub event_type: String,
    pub block_height: u64,
    pub transaction_id: Identifier,
    pub event_index: u32,
    /// Decoded JSON-Cadence payload.
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Reference block for new transactions.
    async fn latest_block_id(&self) -> Result<Identifier, LedgerError>;

    /// Signs and sends `tx`, returning the network-assigned identifier.
    async fn submit(
        &self,
        tx: &Transaction,
        signatories: &Signatories,
    ) -> Result<Identifier, LedgerError>;

    /// Blocks until the transaction is sealed. No deadline beyond whatever
    /// the implementation enforces.
    async fn await_finality(&self, transaction_id: &Identifier)
        -> Result<TransactionResult, LedgerError>;
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn latest_sealed_block(&self) -> Result<BlockHeader, LedgerError>;

    /// Events of `event_type` in the inclusive height range.
    async fn events_in_range(
        &self,
        event_type: &str,
        start_height: u64,
        end_height: u64,
    ) -> Result<Vec<ChainEvent>, LedgerError>;
}
