//! Public entry point for account transactions.
//!
//! Validates input, then hands the lifecycle to the job pool. The sync
//! variant waits on a one-shot completion signal instead of polling.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::db::ListOptions;
use crate::error::WalletError;
use crate::flow::{validate_address, validate_transaction_id, ChainId, FlowAddress};
use crate::jobs::{Job, JobPool};

use super::{Transaction, TransactionArg, TransactionManager, TransactionStore};

pub struct TransactionService {
    manager: Arc<TransactionManager>,
    store: Arc<dyn TransactionStore>,
    pool: Arc<JobPool>,
    chain: ChainId,
}

impl TransactionService {
    pub fn new(
        manager: Arc<TransactionManager>,
        store: Arc<dyn TransactionStore>,
        pool: Arc<JobPool>,
        chain: ChainId,
    ) -> Self {
        Self {
            manager,
            store,
            pool,
            chain,
        }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn pool(&self) -> &Arc<JobPool> {
        &self.pool
    }

    fn schedule(
        &self,
        address: FlowAddress,
        code: String,
        arguments: Vec<TransactionArg>,
        done: Option<oneshot::Sender<Result<Transaction, WalletError>>>,
    ) -> Result<Arc<Job>, WalletError> {
        let manager = self.manager.clone();
        let job = self.pool.submit(async move {
            let outcome = manager.build_and_run(&address, code, arguments).await;
            let summary = match &outcome {
                Ok(tx) => Ok(tx
                    .transaction_id
                    .map(|id| id.hex())
                    .unwrap_or_default()),
                Err(e) => Err(e.to_string()),
            };
            if let Some(done) = done {
                // Receiver may have gone away; the job still records the outcome.
                let _ = done.send(outcome);
            }
            summary
        })?;
        Ok(job)
    }

    /// Runs the transaction to completion and returns it.
    pub async fn create_sync(
        &self,
        address: &str,
        code: String,
        arguments: Vec<TransactionArg>,
    ) -> Result<Transaction, WalletError> {
        let address = validate_address(address, self.chain)?;
        let (done_tx, done_rx) = oneshot::channel();
        let job = self.schedule(address, code, arguments, Some(done_tx))?;

        match done_rx.await {
            Ok(outcome) => outcome,
            // Only if the job body panicked before signalling.
            Err(_) => Err(WalletError::Internal(
                job.wait()
                    .await
                    .error
                    .unwrap_or_else(|| "job ended without a result".to_string()),
            )),
        }
    }

    /// Schedules the transaction and returns its job at once.
    pub fn create_async(
        &self,
        address: &str,
        code: String,
        arguments: Vec<TransactionArg>,
    ) -> Result<Arc<Job>, WalletError> {
        let address = validate_address(address, self.chain)?;
        let job = self.schedule(address, code, arguments, None)?;
        log::info!("[Transactions] Job {} queued for {}", job.id(), address);
        Ok(job)
    }

    pub fn list(
        &self,
        address: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, WalletError> {
        list_transactions(self.store.as_ref(), self.chain, address, limit, offset)
    }

    pub fn details(&self, address: &str, transaction_id: &str) -> Result<Transaction, WalletError> {
        transaction_details(self.store.as_ref(), self.chain, address, transaction_id)
    }
}

/// Validated, paginated listing straight from the store. Needs no ledger
/// or key custody, so read-only hosts call it directly.
pub fn list_transactions(
    store: &dyn TransactionStore,
    chain: ChainId,
    address: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, WalletError> {
    let address = validate_address(address, chain)?;
    Ok(store.transactions(&address, ListOptions::parse(limit, offset))?)
}

pub fn transaction_details(
    store: &dyn TransactionStore,
    chain: ChainId,
    address: &str,
    transaction_id: &str,
) -> Result<Transaction, WalletError> {
    let address = validate_address(address, chain)?;
    let transaction_id = validate_transaction_id(transaction_id)?;

    store
        .transaction(&address, &transaction_id)
        .map_err(|e| match WalletError::from(e) {
            WalletError::NotFound(_) => WalletError::NotFound("transaction not found".into()),
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use crate::keys::StaticKeyManager;
    use crate::test_support::{
        emulator_address, submitted_transaction, test_authorizer, MemoryStore, MockFinality,
        MockLedger,
    };
    use crate::transactions::TransactionState;
    use tokio::sync::Semaphore;

    const ACCOUNT: &str = "0xf8d6e0586b0a20c7";

    struct Harness {
        ledger: Arc<MockLedger>,
        store: Arc<MemoryStore>,
        service: TransactionService,
    }

    fn harness(ledger: MockLedger, workers: usize, backlog: usize) -> Harness {
        let ledger = Arc::new(ledger);
        let store = Arc::new(MemoryStore::new());
        let keys = StaticKeyManager::new();
        keys.register(test_authorizer(emulator_address()));
        let manager = Arc::new(TransactionManager::new(
            ledger.clone(),
            Arc::new(keys),
            store.clone(),
        ));
        let pool = Arc::new(JobPool::new(workers, backlog));
        let service = TransactionService::new(manager, store.clone(), pool, ChainId::Emulator);
        Harness {
            ledger,
            store,
            service,
        }
    }

    #[tokio::test]
    async fn sync_returns_sealed_transaction() {
        let h = harness(MockLedger::new(), 2, 2);
        let tx = h
            .service
            .create_sync(ACCOUNT, "transaction {}".into(), vec![])
            .await
            .unwrap();
        assert_eq!(tx.state, TransactionState::Sealed);
        assert_eq!(h.store.records().len(), 1);
    }

    #[tokio::test]
    async fn sync_returns_typed_error() {
        let h = harness(MockLedger::new().with_finality(MockFinality::Timeout), 1, 1);
        let err = h
            .service
            .create_sync(ACCOUNT, "transaction {}".into(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Finality { .. }));
    }

    #[tokio::test]
    async fn async_returns_job_with_transaction_id() {
        let h = harness(MockLedger::new(), 1, 1);
        let job = h
            .service
            .create_async(ACCOUNT, "transaction {}".into(), vec![])
            .unwrap();

        let state = job.wait().await;
        assert_eq!(state.status, JobStatus::Completed);
        let records = h.store.records();
        assert_eq!(job.result(), records[0].transaction_id.map(|id| id.hex()));
    }

    #[tokio::test]
    async fn invalid_address_schedules_nothing() {
        let h = harness(MockLedger::new(), 1, 1);
        for bad in ["", "0x", "not-an-address", "0x7e60df042a9c0868", "0xf8d6e0586b0a20c7aa"] {
            let err = h
                .service
                .create_async(bad, "transaction {}".into(), vec![])
                .unwrap_err();
            assert!(matches!(err, WalletError::Validation(_)), "{}", bad);

            let err = h
                .service
                .create_sync(bad, "transaction {}".into(), vec![])
                .await
                .unwrap_err();
            assert!(matches!(err, WalletError::Validation(_)));

            assert!(matches!(h.service.list(bad, 10, 0), Err(WalletError::Validation(_))));
        }
        assert!(h.service.pool().list_recent(10).is_empty());
        assert_eq!(h.ledger.submit_calls(), 0);
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn full_pool_maps_to_capacity() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(MockLedger::new().with_finality_gate(gate.clone()), 1, 1);

        let running = h
            .service
            .create_async(ACCOUNT, "transaction {}".into(), vec![])
            .unwrap();
        h.ledger.wait_for_finality_calls(1).await;
        let queued = h
            .service
            .create_async(ACCOUNT, "transaction {}".into(), vec![])
            .unwrap();

        let err = h
            .service
            .create_async(ACCOUNT, "transaction {}".into(), vec![])
            .unwrap_err();
        assert!(matches!(err, WalletError::Capacity));
        assert_eq!(err.status_code(), 503);

        gate.add_permits(2);
        running.wait().await;
        queued.wait().await;
        assert_eq!(h.ledger.submit_calls(), 2);
    }

    #[tokio::test]
    async fn list_uses_pagination_bounds() {
        let h = harness(MockLedger::new(), 1, 1);
        for n in 1..=3u8 {
            h.store.seed(submitted_transaction(n));
        }
        assert_eq!(h.service.list(ACCOUNT, 2, 0).unwrap().len(), 2);
        assert_eq!(h.service.list(ACCOUNT, 2, 2).unwrap().len(), 1);
        assert_eq!(h.service.list(ACCOUNT, -1, -5).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn details_validates_and_translates_not_found() {
        let h = harness(MockLedger::new(), 1, 1);
        // 0xcd bytes, so the id has letters to change case
        let tx = submitted_transaction(0xcd);
        h.store.seed(tx.clone());
        let id = tx.transaction_id.unwrap().hex();
        assert_ne!(id, id.to_uppercase());

        let found = h.service.details(ACCOUNT, &id).unwrap();
        assert_eq!(found.transaction_id, tx.transaction_id);

        let err = h.service.details(ACCOUNT, &id.to_uppercase()).unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));

        let missing = "ab".repeat(32);
        let err = h.service.details(ACCOUNT, &missing).unwrap_err();
        assert!(matches!(err, WalletError::NotFound(ref m) if m == "transaction not found"));
    }
}
