use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("some credentials information are missing: API key or API token")]
    MissingCredentials,

    #[error("email is required when using API key authentication")]
    EmailRequired,

    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to DNS API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("DNS API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<u32>,
        message: String,
    },

    #[error("zone not found: {0}")]
    ZoneNotFound(String),
}

/// Everything a provider client is bound to for the lifetime of one request.
#[derive(Debug, Clone, Default)]
pub struct ProviderParams {
    pub base_url: Option<String>,
    pub email: String,
    pub api_key: String,
    pub api_token: String,
    pub nameservers: Vec<String>,
    pub user_agent: String,
}

#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    /// Publish `value` as a TXT record at `fqdn` inside `zone`
    async fn present(&self, zone: &str, fqdn: &str, value: &str) -> Result<(), ProviderError>;

    /// Remove the TXT record previously published by `present`
    async fn clean_up(&self, zone: &str, fqdn: &str, value: &str) -> Result<(), ProviderError>;

    /// Recursive nameservers the client was configured with
    fn nameservers(&self) -> &[String];

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

/// Builds provider clients. Validation of the parameter combination belongs
/// to the implementation.
pub trait ProviderConstructor: Send + Sync {
    fn construct(&self, params: ProviderParams) -> Result<Box<dyn ChallengeProvider>, ProviderError>;
}
