use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use super::{ChallengeRequest, Solver};
use crate::config::{self, HostConfig};
use crate::dns::{ChallengeProvider, CloudflareConstructor, ProviderConstructor, ProviderFactory};
use crate::error::{Operation, Result, SolverError};
use crate::secrets::{CredentialResolver, KubeSecretStore, SecretStore};

pub const SOLVER_NAME: &str = "ace";

/// DNS-01 solver that reads provider credentials from Kubernetes secrets and
/// publishes challenge records through the configured DNS API.
pub struct AceSolver {
    factory: ProviderFactory,
    call_timeout: Duration,
}

impl AceSolver {
    pub fn new(
        store: Arc<dyn SecretStore>,
        constructor: Arc<dyn ProviderConstructor>,
        user_agent: impl Into<String>,
        nameservers: Vec<String>,
        call_timeout: Duration,
    ) -> Self {
        let factory = ProviderFactory::new(
            CredentialResolver::new(store),
            constructor,
            user_agent,
            nameservers,
        );

        Self {
            factory,
            call_timeout,
        }
    }

    /// Like [`Solver::present`], with a caller-chosen deadline.
    pub async fn present_within(&self, ch: &ChallengeRequest, timeout: Duration) -> Result<()> {
        with_deadline(Operation::Present, ch, timeout, self.run(Operation::Present, ch)).await
    }

    /// Like [`Solver::clean_up`], with a caller-chosen deadline.
    pub async fn clean_up_within(&self, ch: &ChallengeRequest, timeout: Duration) -> Result<()> {
        with_deadline(Operation::CleanUp, ch, timeout, self.run(Operation::CleanUp, ch)).await
    }

    async fn provider_for(&self, ch: &ChallengeRequest) -> Result<Box<dyn ChallengeProvider>> {
        let cfg = config::decode(ch.config_bytes())?;
        self.factory.build(&cfg, &ch.resource_namespace).await
    }

    async fn run(&self, operation: Operation, ch: &ChallengeRequest) -> Result<()> {
        match operation {
            Operation::Present => info!(
                fqdn = %ch.resolved_fqdn,
                zone = %ch.resolved_zone,
                "Presenting challenge"
            ),
            Operation::CleanUp => info!(fqdn = %ch.resolved_fqdn, "Cleaning up entry"),
        }

        let provider = self.provider_for(ch).await.map_err(|source| {
            error!(fqdn = %ch.resolved_fqdn, error = %source, "failed to get client from ChallengeRequest");
            SolverError::Client {
                fqdn: ch.resolved_fqdn.clone(),
                zone: ch.resolved_zone.clone(),
                source: Box::new(source),
            }
        })?;

        let zone = normalize_zone(&ch.resolved_zone);
        let result = match operation {
            Operation::Present => provider.present(zone, &ch.resolved_fqdn, &ch.key).await,
            Operation::CleanUp => provider.clean_up(zone, &ch.resolved_fqdn, &ch.key).await,
        };

        result.map_err(|source| {
            let err = SolverError::Backend {
                operation,
                fqdn: ch.resolved_fqdn.clone(),
                zone: zone.to_string(),
                source,
            };
            error!(provider = provider.provider_name(), error = %err, "DNS provider call failed");
            err
        })
    }
}

/// Strip the trailing root separator from a zone name.
pub fn normalize_zone(zone: &str) -> &str {
    zone.strip_suffix('.').unwrap_or(zone)
}

async fn with_deadline<F>(
    operation: Operation,
    ch: &ChallengeRequest,
    timeout: Duration,
    fut: F,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            let err = SolverError::DeadlineExceeded {
                operation,
                fqdn: ch.resolved_fqdn.clone(),
                zone: ch.resolved_zone.clone(),
                timeout,
            };
            error!(error = %err, "Challenge call timed out");
            Err(err)
        }
    }
}

#[async_trait]
impl Solver for AceSolver {
    fn name(&self) -> &'static str {
        SOLVER_NAME
    }

    fn initialize(host: &HostConfig) -> Result<Self> {
        let store = KubeSecretStore::new(host).map_err(SolverError::SecretStoreInit)?;

        info!(api_url = %host.api_url, user_agent = %host.user_agent, "Initialized secret store client");

        Ok(Self::new(
            Arc::new(store),
            Arc::new(CloudflareConstructor),
            host.user_agent.clone(),
            host.nameservers.clone(),
            host.call_timeout,
        ))
    }

    async fn present(&self, ch: &ChallengeRequest) -> Result<()> {
        self.present_within(ch, self.call_timeout).await
    }

    async fn clean_up(&self, ch: &ChallengeRequest) -> Result<()> {
        self.clean_up_within(ch, self.call_timeout).await
    }
}
