//! Account Transactions
//!
//! ## Flow
//! 1. [`TransactionService`] validates the account address and schedules the
//!    work on the job pool
//! 2. A worker runs [`TransactionManager::build_and_run`]: reference block,
//!    authorizer, submit, record, wait for seal, record again
//! 3. The caller either awaits the outcome (`create_sync`) or keeps the job
//!    handle (`create_async`)

mod manager;
mod service;
mod store;
mod types;

pub use manager::{requires_account_authorization, TransactionManager, AUTH_ACCOUNT_MARKER};
pub use service::{list_transactions, transaction_details, TransactionService};
pub use store::TransactionStore;
pub use types::{Transaction, TransactionArg, TransactionState};
