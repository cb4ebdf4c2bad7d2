//! Transaction lifecycle
//!
//! Builds a transaction for a managed account, submits it and waits for it
//! to seal, persisting a checkpoint right after submission and again once
//! the outcome is known. Nothing here retries: callers re-submit.

use std::sync::Arc;

use crate::error::WalletError;
use crate::flow::{FlowAddress, LedgerClient, Signatories};
use crate::keys::{Authorizer, KeyManager};

use super::{Transaction, TransactionArg, TransactionState, TransactionStore};

/// Text that marks a transaction declaring an account-authorization parameter.
pub const AUTH_ACCOUNT_MARKER: &str = ": AuthAccount";

/// Substring match on the source text, not a parse. It can also match
/// inside comments or string literals.
pub fn requires_account_authorization(code: &str) -> bool {
    code.contains(AUTH_ACCOUNT_MARKER)
}

pub struct TransactionManager {
    ledger: Arc<dyn LedgerClient>,
    keys: Arc<dyn KeyManager>,
    store: Arc<dyn TransactionStore>,
}

impl TransactionManager {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        keys: Arc<dyn KeyManager>,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        log::info!(
            "[Transactions] Manager ready (key custody: {})",
            keys.mode_name()
        );
        Self {
            ledger,
            keys,
            store,
        }
    }

    /// Runs `code` for `address` and returns the finalized transaction.
    ///
    /// The account's authorizer acts as proposer and payer, and also as
    /// authorizer when the code asks for an account. A submission failure
    /// leaves no record; once submitted the transaction is always recorded
    /// before waiting for the seal.
    pub async fn build_and_run(
        &self,
        address: &FlowAddress,
        code: String,
        arguments: Vec<TransactionArg>,
    ) -> Result<Transaction, WalletError> {
        let reference_block_id = self
            .ledger
            .latest_block_id()
            .await
            .map_err(WalletError::Submission)?;

        let authorizer = self.keys.authorizer_for(address).await?;

        let authorizers: Vec<Authorizer> = if requires_account_authorization(&code) {
            vec![authorizer.clone()]
        } else {
            Vec::new()
        };

        let mut tx = Transaction::new(
            reference_block_id,
            code,
            arguments,
            &authorizer,
            &authorizer,
            &authorizers,
        );
        let signatories = Signatories {
            proposer: authorizer.clone(),
            payer: authorizer,
            authorizers,
        };

        let transaction_id = match self.ledger.submit(&tx, &signatories).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("[Transactions] Submission for {} failed: {}", address, e);
                return Err(WalletError::Submission(e));
            }
        };
        tx.mark_submitted(transaction_id)?;
        log::info!("[Transactions] Submitted {} for {}", transaction_id, address);

        if let Err(source) = self.store.insert_transaction(&tx) {
            log::error!(
                "[Transactions] Transaction {} is on the ledger but was not recorded: {}",
                transaction_id,
                source
            );
            return Err(WalletError::Persistence {
                transaction_id: Some(transaction_id),
                source,
            });
        }

        let outcome = match self.ledger.await_finality(&transaction_id).await {
            Ok(result) => match result.error_message {
                None => {
                    tx.advance(TransactionState::Sealed);
                    Ok(())
                }
                Some(reason) => {
                    tx.advance(TransactionState::Failed);
                    tx.record_error(reason.clone());
                    Err(WalletError::Finality {
                        transaction_id,
                        reason,
                    })
                }
            },
            Err(e) => {
                // Still live on the ledger as far as we know; stays submitted.
                let reason = e.to_string();
                tx.record_error(reason.clone());
                Err(WalletError::Finality {
                    transaction_id,
                    reason,
                })
            }
        };

        match (outcome, self.store.update_transaction(&tx)) {
            (Ok(()), Ok(())) => {
                log::info!("[Transactions] {} sealed", transaction_id);
                Ok(tx)
            }
            (Ok(()), Err(source)) => {
                log::error!(
                    "[Transactions] {} sealed but its record is stale: {}",
                    transaction_id,
                    source
                );
                Err(WalletError::Persistence {
                    transaction_id: Some(transaction_id),
                    source,
                })
            }
            (Err(e), update) => {
                if let Err(source) = update {
                    log::error!(
                        "[Transactions] Could not record outcome of {}: {}",
                        transaction_id,
                        source
                    );
                }
                log::warn!("[Transactions] {}", e);
                Err(e)
            }
        }
    }
}
