//! Flow network primitives and the ledger collaborator boundary.

mod access_client;
mod address;
mod identifier;
mod ledger;

pub use access_client::AccessClient;
pub use address::{validate_address, ChainId, FlowAddress};
pub use identifier::{validate_transaction_id, Identifier};
pub use ledger::{
    BlockHeader, ChainEvent, ChainReader, LedgerClient, LedgerError, Signatories,
    TransactionResult,
};
