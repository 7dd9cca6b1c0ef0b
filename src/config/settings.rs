use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use super::HostConfig;
use crate::dns::RECURSIVE_NAMESERVERS;

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub secret_store: SecretStoreSettings,
    #[serde(default)]
    pub solver: SolverSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Text => write!(f, "text"),
        }
    }
}

/// Where to reach the Kubernetes API. Unset fields fall back to the
/// in-cluster service account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretStoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,
    #[serde(default = "default_nameservers")]
    pub nameservers: Vec<String>,
}

fn default_listen() -> String {
    "0.0.0.0:8443".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_agent() -> String {
    format!("ace-webhook/{}", env!("CARGO_PKG_VERSION"))
}

fn default_call_timeout() -> u64 {
    120
}

fn default_nameservers() -> Vec<String> {
    RECURSIVE_NAMESERVERS.iter().map(|ns| ns.to_string()).collect()
}

impl Settings {
    /// Load settings from `path`, or from the default location when no path
    /// is given. A missing default file is fine; a missing explicit one is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    pub fn config_path() -> PathBuf {
        PathBuf::from("/etc/ace-webhook/config.toml")
    }

    /// Resolve the connection settings the solver is initialized with.
    pub fn host_config(&self) -> Result<HostConfig> {
        let store = &self.secret_store;

        if self.solver.call_timeout_seconds == 0 {
            return Err(anyhow!("solver.call_timeout_seconds must be greater than zero"));
        }

        let api_url = match &store.api_url {
            Some(url) => url.clone(),
            None => in_cluster_api_url()?,
        };

        let token = read_optional(store.token_file.as_deref(), SERVICE_ACCOUNT_TOKEN)?
            .map(|raw| String::from_utf8_lossy(&raw).trim().to_string())
            .filter(|token| !token.is_empty());

        let ca_pem = read_optional(store.ca_file.as_deref(), SERVICE_ACCOUNT_CA)?;

        Ok(HostConfig {
            api_url,
            token,
            ca_pem,
            user_agent: self.solver.user_agent.clone(),
            nameservers: self.solver.nameservers.clone(),
            call_timeout: Duration::from_secs(self.solver.call_timeout_seconds),
        })
    }
}

fn in_cluster_api_url() -> Result<String> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
        anyhow!("secret_store.api_url is not set and KUBERNETES_SERVICE_HOST is not available")
    })?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

    // IPv6 service hosts need brackets
    if host.contains(':') {
        Ok(format!("https://[{}]:{}", host, port))
    } else {
        Ok(format!("https://{}:{}", host, port))
    }
}

fn read_optional(configured: Option<&Path>, fallback: &str) -> Result<Option<Vec<u8>>> {
    let path = match configured {
        Some(path) => path,
        None => {
            let fallback = Path::new(fallback);
            if !fallback.exists() {
                return Ok(None);
            }
            fallback
        }
    };

    fs::read(path)
        .map(Some)
        .with_context(|| format!("Failed to read {}", path.display()))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            call_timeout_seconds: default_call_timeout(),
            nameservers: default_nameservers(),
        }
    }
}
