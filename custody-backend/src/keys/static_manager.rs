//! In-process key manager.
//!
//! Holds authorizers registered at startup. Suitable for hosts that keep
//! signers in memory and for wiring the service without a remote custodian.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Authorizer, KeyError, KeyManager};
use crate::flow::FlowAddress;

#[derive(Default)]
pub struct StaticKeyManager {
    authorizers: DashMap<FlowAddress, Authorizer>,
}

impl StaticKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the authorizer for its account.
    pub fn register(&self, authorizer: Authorizer) {
        log::info!(
            "[Keys] Registered key {} for account {}",
            authorizer.key_index,
            authorizer.address
        );
        self.authorizers.insert(authorizer.address, authorizer);
    }

    pub fn remove(&self, address: &FlowAddress) -> Option<Authorizer> {
        self.authorizers.remove(address).map(|(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.authorizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorizers.is_empty()
    }
}

#[async_trait]
impl KeyManager for StaticKeyManager {
    async fn authorizer_for(&self, address: &FlowAddress) -> Result<Authorizer, KeyError> {
        self.authorizers
            .get(address)
            .map(|a| a.value().clone())
            .ok_or_else(|| KeyError::UnknownAccount(address.to_string()))
    }

    fn mode_name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{emulator_address, NoopSigner};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_registered_authorizer() {
        let manager = StaticKeyManager::new();
        let address = emulator_address();
        manager.register(Authorizer::new(address, 2, Arc::new(NoopSigner)));

        let authorizer = manager.authorizer_for(&address).await.unwrap();
        assert_eq!(authorizer.address, address);
        assert_eq!(authorizer.key_index, 2);
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn unknown_account_is_an_error() {
        let manager = StaticKeyManager::new();
        let err = manager.authorizer_for(&emulator_address()).await.unwrap_err();
        assert!(matches!(err, KeyError::UnknownAccount(_)));
    }

    #[tokio::test]
    async fn register_replaces_previous_key() {
        let manager = StaticKeyManager::new();
        let address = emulator_address();
        manager.register(Authorizer::new(address, 0, Arc::new(NoopSigner)));
        manager.register(Authorizer::new(address, 1, Arc::new(NoopSigner)));

        let authorizer = manager.authorizer_for(&address).await.unwrap();
        assert_eq!(authorizer.key_index, 1);
        assert!(manager.remove(&address).is_some());
        assert!(manager.is_empty());
    }
}
