//! Collaborator doubles shared by unit tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::{watch, Semaphore};

use crate::db::{Database, ListOptions, StatusDatabase, StoreError};
use crate::flow::{
    BlockHeader, ChainEvent, ChainReader, FlowAddress, Identifier, LedgerClient, LedgerError,
    Signatories, TransactionResult,
};
use crate::keys::{Authorizer, KeyError, Signer};
use crate::transactions::{Transaction, TransactionState, TransactionStore};

pub fn emulator_address() -> FlowAddress {
    FlowAddress::from_str("0xf8d6e0586b0a20c7").unwrap()
}

pub struct NoopSigner;

impl Signer for NoopSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        Ok(message.to_vec())
    }
}

pub fn test_authorizer(address: FlowAddress) -> Authorizer {
    Authorizer::new(address, 0, Arc::new(NoopSigner))
}

pub fn temp_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custody.db");
    let db = Database::new(path.to_str().unwrap()).unwrap();
    (dir, db)
}

pub fn temp_status_database() -> (tempfile::TempDir, StatusDatabase) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listener-status.db");
    let db = StatusDatabase::new(path.to_str().unwrap()).unwrap();
    (dir, db)
}

/// Submitted transaction for the emulator service account. Higher `n` means
/// a later `created_at`.
pub fn submitted_transaction(n: u8) -> Transaction {
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        + chrono::Duration::seconds(n as i64);
    Transaction {
        transaction_id: Some(Identifier::from_bytes(&[n; 32])),
        address: emulator_address(),
        proposer: emulator_address(),
        payer: emulator_address(),
        authorizers: vec![emulator_address()],
        code: "transaction { prepare(signer: AuthAccount) {} }".to_string(),
        arguments: vec![serde_json::json!({"type": "UFix64", "value": "1.00000000"})],
        reference_block_id: Identifier::from_bytes(&[0xbb; 32]),
        state: TransactionState::Submitted,
        error: None,
        created_at,
        updated_at: created_at,
    }
}

#[derive(Debug, Clone)]
pub enum MockFinality {
    Sealed,
    ExecutionError(String),
    Timeout,
}

/// Ledger double. Hands out sequential transaction ids.
pub struct MockLedger {
    fail_latest_block: bool,
    fail_submit: bool,
    finality: MockFinality,
    finality_gate: Option<Arc<Semaphore>>,
    next_id: AtomicU64,
    submitted: Mutex<Vec<Transaction>>,
    finality_calls: watch::Sender<usize>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            fail_latest_block: false,
            fail_submit: false,
            finality: MockFinality::Sealed,
            finality_gate: None,
            next_id: AtomicU64::new(1),
            submitted: Mutex::new(Vec::new()),
            finality_calls: watch::channel(0).0,
        }
    }

    pub fn failing_latest_block(mut self) -> Self {
        self.fail_latest_block = true;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn with_finality(mut self, finality: MockFinality) -> Self {
        self.finality = finality;
        self
    }

    /// Every finality wait holds until it can take a permit from `gate`.
    pub fn with_finality_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.finality_gate = Some(gate);
        self
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn finality_calls(&self) -> usize {
        *self.finality_calls.borrow()
    }

    pub async fn wait_for_finality_calls(&self, n: usize) {
        let mut rx = self.finality_calls.subscribe();
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_block_id(&self) -> Result<Identifier, LedgerError> {
        if self.fail_latest_block {
            return Err(LedgerError::Api {
                status: 503,
                message: "access node unavailable".into(),
            });
        }
        Ok(Identifier::from_bytes(&[0xbb; 32]))
    }

    async fn submit(
        &self,
        tx: &Transaction,
        _signatories: &Signatories,
    ) -> Result<Identifier, LedgerError> {
        if self.fail_submit {
            return Err(LedgerError::Rejected("invalid proposal key".into()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        self.submitted.lock().push(tx.clone());
        Ok(Identifier::from_bytes(&bytes))
    }

    async fn await_finality(
        &self,
        _transaction_id: &Identifier,
    ) -> Result<TransactionResult, LedgerError> {
        self.finality_calls.send_modify(|calls| *calls += 1);
        if let Some(gate) = &self.finality_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| LedgerError::Decode(e.to_string()))?;
        }
        match &self.finality {
            MockFinality::Sealed => Ok(TransactionResult::sealed()),
            MockFinality::ExecutionError(msg) => Ok(TransactionResult::failed(msg.clone())),
            MockFinality::Timeout => Err(LedgerError::Timeout),
        }
    }
}

/// In-memory transaction store that counts every call.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Transaction>>,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    queries: AtomicUsize,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    /// Adds a record without counting it as a call.
    pub fn seed(&self, tx: Transaction) {
        self.records.lock().push(tx);
    }

    pub fn records(&self) -> Vec<Transaction> {
        self.records.lock().clone()
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.inserts() + self.updates() + self.queries.load(Ordering::SeqCst)
    }
}

impl TransactionStore for MemoryStore {
    fn insert_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("disk full".into()));
        }
        self.records.lock().push(tx.clone());
        Ok(())
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock();
        let existing = records
            .iter_mut()
            .find(|r| r.transaction_id == tx.transaction_id)
            .ok_or(StoreError::NotFound)?;
        *existing = tx.clone();
        Ok(())
    }

    fn transactions(
        &self,
        address: &FlowAddress,
        opts: ListOptions,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut matching: Vec<Transaction> = self
            .records
            .lock()
            .iter()
            .filter(|r| &r.address == address)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(opts.offset)
            .take(opts.limit)
            .collect())
    }

    fn transaction(
        &self,
        address: &FlowAddress,
        transaction_id: &Identifier,
    ) -> Result<Transaction, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .iter()
            .find(|r| &r.address == address && r.transaction_id.as_ref() == Some(transaction_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

/// Chain reader double with a settable sealed height and canned events.
pub struct MockChainReader {
    height: AtomicU64,
    fail: AtomicBool,
    events: Mutex<HashMap<String, Vec<ChainEvent>>>,
    queries: Mutex<Vec<(String, u64, u64)>>,
}

impl MockChainReader {
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
            fail: AtomicBool::new(false),
            events: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn add_event(&self, event: ChainEvent) {
        self.events
            .lock()
            .entry(event.event_type.clone())
            .or_default()
            .push(event);
    }

    /// `(event_type, start, end)` of every range query so far
    pub fn queries(&self) -> Vec<(String, u64, u64)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn latest_sealed_block(&self) -> Result<BlockHeader, LedgerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Timeout);
        }
        Ok(BlockHeader {
            id: Identifier::from_bytes(&[0xcc; 32]),
            height: self.height.load(Ordering::SeqCst),
        })
    }

    async fn events_in_range(
        &self,
        event_type: &str,
        start_height: u64,
        end_height: u64,
    ) -> Result<Vec<ChainEvent>, LedgerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Timeout);
        }
        self.queries
            .lock()
            .push((event_type.to_string(), start_height, end_height));
        Ok(self
            .events
            .lock()
            .get(event_type)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.block_height >= start_height && e.block_height <= end_height)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn base_state() -> (tempfile::TempDir, crate::AppState) {
    use crate::config::Config;
    use crate::templates::Templates;

    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("custody.db").to_str().unwrap()).unwrap();
    let status_db =
        StatusDatabase::new(dir.path().join("listener-status.db").to_str().unwrap()).unwrap();
    let config = Config::from_lookup(|name| match name {
        "FLOW_WALLET_WORKER_COUNT" => Some("2".to_string()),
        "FLOW_WALLET_JOB_QUEUE_CAPACITY" => Some("4".to_string()),
        _ => None,
    })
    .unwrap();
    let templates = Arc::new(Templates::new(config.chain_id, config.enabled_tokens.clone()));

    let state = crate::AppState::new(config, Arc::new(db), Arc::new(status_db), templates);
    (dir, state)
}

/// App state over temp databases without submission.
pub fn read_only_state() -> (tempfile::TempDir, actix_web::web::Data<crate::AppState>) {
    let (dir, state) = base_state();
    (dir, actix_web::web::Data::new(state))
}

/// App state over temp databases, with transactions for the emulator
/// service account run by `ledger` on a 2-worker pool.
pub fn test_state(ledger: MockLedger) -> (tempfile::TempDir, actix_web::web::Data<crate::AppState>) {
    use crate::keys::StaticKeyManager;

    let (dir, state) = base_state();
    let keys = StaticKeyManager::new();
    keys.register(test_authorizer(emulator_address()));
    let state = state.with_submission(Arc::new(ledger), Arc::new(keys));
    (dir, actix_web::web::Data::new(state))
}
