use std::sync::Arc;

use tracing::debug;

use super::store::SecretStore;
use crate::config::SecretKeySelector;
use crate::error::{Result, SolverError};

/// Looks up a single credential value. Every call goes to the store; nothing
/// is cached.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, selector: &SecretKeySelector, namespace: &str) -> Result<Vec<u8>> {
        debug!(namespace, secret = %selector.name, key = %selector.key, "Resolving credential");

        let mut secret = self
            .store
            .get(namespace, &selector.name)
            .await
            .map_err(|source| SolverError::SecretLookup {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
                source,
            })?;

        secret
            .data
            .remove(&selector.key)
            .ok_or_else(|| SolverError::MissingKey {
                key: selector.key.clone(),
                namespace: namespace.to_string(),
                name: selector.name.clone(),
            })
    }
}
