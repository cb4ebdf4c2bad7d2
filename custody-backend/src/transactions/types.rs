//! Transaction data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::WalletError;
use crate::flow::{FlowAddress, Identifier};
use crate::keys::Authorizer;

/// JSON-Cadence encoded argument
pub type TransactionArg = serde_json::Value;

/// Lifecycle state of a transaction. Only moves forward:
/// built -> submitted -> sealed, or -> failed from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionState {
    /// Built in memory, not yet accepted by the ledger
    Built,
    /// Accepted by the ledger, has an identifier, not yet sealed
    Submitted,
    /// Sealed without execution error
    Sealed,
    /// Sealed with an execution error
    Failed,
}

impl TransactionState {
    pub fn can_advance_to(self, next: TransactionState) -> bool {
        matches!(
            (self, next),
            (TransactionState::Built, TransactionState::Submitted)
                | (TransactionState::Built, TransactionState::Failed)
                | (TransactionState::Submitted, TransactionState::Sealed)
                | (TransactionState::Submitted, TransactionState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Sealed | TransactionState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Network identifier, set once after successful submission
    pub transaction_id: Option<Identifier>,
    /// Managed account the transaction was sent for
    pub address: FlowAddress,
    pub proposer: FlowAddress,
    pub payer: FlowAddress,
    pub authorizers: Vec<FlowAddress>,
    pub code: String,
    pub arguments: Vec<TransactionArg>,
    pub reference_block_id: Identifier,
    pub state: TransactionState,
    /// Last error reported while waiting for or executing the transaction
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        reference_block_id: Identifier,
        code: String,
        arguments: Vec<TransactionArg>,
        proposer: &Authorizer,
        payer: &Authorizer,
        authorizers: &[Authorizer],
    ) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: None,
            address: proposer.address,
            proposer: proposer.address,
            payer: payer.address,
            authorizers: authorizers.iter().map(|a| a.address).collect(),
            code,
            arguments,
            reference_block_id,
            state: TransactionState::Built,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records the network identifier and moves to `Submitted`.
    /// Fails if an identifier was already assigned.
    pub fn mark_submitted(&mut self, transaction_id: Identifier) -> Result<(), WalletError> {
        if let Some(existing) = self.transaction_id {
            return Err(WalletError::Internal(format!(
                "transaction already has identifier {}",
                existing
            )));
        }
        self.transaction_id = Some(transaction_id);
        self.advance(TransactionState::Submitted);
        Ok(())
    }

    pub fn advance(&mut self, next: TransactionState) -> bool {
        if !self.state.can_advance_to(next) {
            log::warn!(
                "[Transactions] Refusing state change {} -> {} for {:?}",
                self.state,
                next,
                self.transaction_id
            );
            return false;
        }
        self.state = next;
        self.updated_at = Utc::now();
        true
    }

    /// Notes a wait failure without changing state.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.updated_at = Utc::now();
    }
}
