//! Transaction-submission core of a custodial Flow wallet service.

use std::sync::Arc;

pub mod chain_events;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod flow;
pub mod jobs;
pub mod keys;
pub mod templates;
pub mod transactions;

#[cfg(test)]
mod test_support;

use config::Config;
use db::{Database, StatusDatabase};
use flow::LedgerClient;
use jobs::JobPool;
use keys::KeyManager;
use templates::Templates;
use transactions::{TransactionManager, TransactionService};

/// Shared state handed to every HTTP handler.
pub struct AppState {
    pub config: Config,
    pub db: Arc<Database>,
    pub status_db: Arc<StatusDatabase>,
    pub templates: Arc<Templates>,
    pub jobs: Arc<JobPool>,
    /// Present when the host wired a ledger client and key custody.
    pub transactions: Option<Arc<TransactionService>>,
}

impl AppState {
    /// Read-only state: listing, details, job lookup and listener status.
    /// Starts the job pool sized from `config`, so must run inside a Tokio
    /// runtime.
    pub fn new(
        config: Config,
        db: Arc<Database>,
        status_db: Arc<StatusDatabase>,
        templates: Arc<Templates>,
    ) -> Self {
        let jobs = Arc::new(JobPool::new(config.worker_count, config.job_queue_capacity));
        Self {
            config,
            db,
            status_db,
            templates,
            jobs,
            transactions: None,
        }
    }

    /// Enables submission through `ledger`, signing with `keys`, on the
    /// shared job pool.
    pub fn with_submission(
        mut self,
        ledger: Arc<dyn LedgerClient>,
        keys: Arc<dyn KeyManager>,
    ) -> Self {
        let manager = Arc::new(TransactionManager::new(ledger, keys, self.db.clone()));
        self.transactions = Some(Arc::new(TransactionService::new(
            manager,
            self.db.clone(),
            self.jobs.clone(),
            self.config.chain_id,
        )));
        self
    }
}
