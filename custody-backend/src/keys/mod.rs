//! Key Custody Abstraction
//!
//! The transaction manager never touches key material. It asks a
//! [`KeyManager`] for an [`Authorizer`] for the managed account and hands
//! that capability to the ledger client, which signs as proposer, payer or
//! additional authorizer.
//!
//! Providers:
//! - [`StaticKeyManager`]: authorizers registered in-process at startup

mod static_manager;

pub use static_manager::StaticKeyManager;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::flow::FlowAddress;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no signing key for account {0}")]
    UnknownAccount(String),

    #[error("key custody unavailable: {0}")]
    Unavailable(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Opaque signing capability backed by custody (HSM, KMS, local key).
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError>;
}

/// An account key usable to sign a transaction in any role.
#[derive(Clone)]
pub struct Authorizer {
    pub address: FlowAddress,
    pub key_index: u32,
    signer: Arc<dyn Signer>,
}

impl Authorizer {
    pub fn new(address: FlowAddress, key_index: u32, signer: Arc<dyn Signer>) -> Self {
        Self {
            address,
            key_index,
            signer,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.signer.sign(message)
    }
}

impl PartialEq for Authorizer {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.key_index == other.key_index
    }
}

impl Eq for Authorizer {}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("address", &self.address)
            .field("key_index", &self.key_index)
            .finish_non_exhaustive()
    }
}

/// Trait for key custody providers
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Authorizer for a managed account. May reach a remote custody service.
    async fn authorizer_for(&self, address: &FlowAddress) -> Result<Authorizer, KeyError>;

    /// Provider name for logging
    fn mode_name(&self) -> &'static str;
}
