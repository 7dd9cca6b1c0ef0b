//! In-memory fakes for the secret store and the provider client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::dns::{ChallengeProvider, ProviderConstructor, ProviderError, ProviderParams};
use crate::secrets::{Secret, SecretStore, SecretStoreError};

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: HashMap<(String, String), Secret>,
    lookups: AtomicUsize,
}

impl MemorySecretStore {
    pub fn with_secret(mut self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let data = data
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        self.secrets
            .insert((namespace.to_string(), name.to_string()), Secret { data });
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, SecretStoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or(SecretStoreError::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub action: &'static str,
    pub zone: String,
    pub fqdn: String,
    pub value: String,
}

/// Hands out providers that record every call instead of talking to a backend.
#[derive(Clone, Default)]
pub struct RecordingConstructor {
    pub params: Arc<Mutex<Vec<ProviderParams>>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub backend_fails: bool,
    pub delay: Option<Duration>,
}

impl RecordingConstructor {
    pub fn constructed(&self) -> Vec<ProviderParams> {
        self.params.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProviderConstructor for RecordingConstructor {
    fn construct(&self, params: ProviderParams) -> Result<Box<dyn ChallengeProvider>, ProviderError> {
        self.params.lock().unwrap().push(params.clone());
        Ok(Box::new(RecordingProvider {
            calls: self.calls.clone(),
            backend_fails: self.backend_fails,
            delay: self.delay,
            nameservers: params.nameservers,
        }))
    }
}

struct RecordingProvider {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    backend_fails: bool,
    delay: Option<Duration>,
    nameservers: Vec<String>,
}

impl RecordingProvider {
    async fn record(
        &self,
        action: &'static str,
        zone: &str,
        fqdn: &str,
        value: &str,
    ) -> Result<(), ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(RecordedCall {
            action,
            zone: zone.to_string(),
            fqdn: fqdn.to_string(),
            value: value.to_string(),
        });
        if self.backend_fails {
            return Err(ProviderError::Api {
                status: 429,
                code: None,
                message: "rate limited".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChallengeProvider for RecordingProvider {
    async fn present(&self, zone: &str, fqdn: &str, value: &str) -> Result<(), ProviderError> {
        self.record("present", zone, fqdn, value).await
    }

    async fn clean_up(&self, zone: &str, fqdn: &str, value: &str) -> Result<(), ProviderError> {
        self.record("clean_up", zone, fqdn, value).await
    }

    fn nameservers(&self) -> &[String] {
        &self.nameservers
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}
