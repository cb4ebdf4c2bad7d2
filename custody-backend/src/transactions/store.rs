use crate::db::{ListOptions, StoreError};
use crate::flow::{FlowAddress, Identifier};

use super::Transaction;

/// Persistence used by the transaction manager and service.
///
/// `Database` is the production implementation; a missing record must be
/// reported as [`StoreError::NotFound`].
pub trait TransactionStore: Send + Sync {
    fn insert_transaction(&self, tx: &Transaction) -> Result<(), StoreError>;

    fn update_transaction(&self, tx: &Transaction) -> Result<(), StoreError>;

    fn transactions(
        &self,
        address: &FlowAddress,
        opts: ListOptions,
    ) -> Result<Vec<Transaction>, StoreError>;

    fn transaction(
        &self,
        address: &FlowAddress,
        transaction_id: &Identifier,
    ) -> Result<Transaction, StoreError>;
}
