use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// A secret object: named values holding raw bytes.
#[derive(Debug, Clone, Default)]
pub struct Secret {
    pub data: HashMap<String, Vec<u8>>,
}

#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("secret not found")]
    NotFound,

    #[error("invalid secret store URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build secret store client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to secret store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("secret store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid secret payload: {0}")]
    Decode(String),
}

impl SecretStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretStoreError::NotFound)
    }
}

/// Read-only access to namespaced secrets. Implementations must be safe to
/// share between concurrent challenge requests.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, SecretStoreError>;
}
