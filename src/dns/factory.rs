use std::sync::Arc;

use tracing::info;

use super::provider::{ChallengeProvider, ProviderConstructor, ProviderParams};
use crate::config::{ProviderConfig, SecretKeySelector};
use crate::error::{Result, SolverError};
use crate::secrets::CredentialResolver;

/// Turns a decoded solver config into a provider client bound to freshly
/// resolved credentials.
pub struct ProviderFactory {
    resolver: CredentialResolver,
    constructor: Arc<dyn ProviderConstructor>,
    user_agent: String,
    nameservers: Vec<String>,
}

impl ProviderFactory {
    pub fn new(
        resolver: CredentialResolver,
        constructor: Arc<dyn ProviderConstructor>,
        user_agent: impl Into<String>,
        nameservers: Vec<String>,
    ) -> Self {
        Self {
            resolver,
            constructor,
            user_agent: user_agent.into(),
            nameservers,
        }
    }

    pub async fn build(
        &self,
        config: &ProviderConfig,
        namespace: &str,
    ) -> Result<Box<dyn ChallengeProvider>> {
        info!(namespace, "preparing to create ace provider");

        if config.api_key.is_some() && config.api_token.is_some() {
            return Err(SolverError::AmbiguousCredentials);
        }

        // With neither reference set the empty selector is looked up and the
        // store reports what is missing.
        let empty = SecretKeySelector::default();
        let selector = config
            .api_key
            .as_ref()
            .or(config.api_token.as_ref())
            .unwrap_or(&empty);

        let raw = self.resolver.resolve(selector, namespace).await?;
        let credential = String::from_utf8_lossy(&raw).into_owned();

        let (api_key, api_token) = if config.api_key.is_some() {
            (credential, String::new())
        } else {
            (String::new(), credential)
        };

        let params = ProviderParams {
            base_url: config.base_url.clone(),
            email: config.email.clone().unwrap_or_default(),
            api_key,
            api_token,
            nameservers: self.nameservers.clone(),
            user_agent: self.user_agent.clone(),
        };

        self.constructor
            .construct(params)
            .map_err(SolverError::ProviderInit)
    }
}
