use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Reference to one value inside a Kubernetes secret. The namespace comes
/// from the challenge request, not from the issuer config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
}

/// Per-issuer solver configuration, as embedded in the challenge request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Account email, only needed with API key authentication.
    #[serde(rename = "Email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Override for the DNS API endpoint, e.g. when running through a proxy.
    #[serde(rename = "BaseURL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(rename = "APIKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretKeySelector>,

    /// API token; preferred over API keys since it can be scoped.
    #[serde(rename = "APIToken", default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<SecretKeySelector>,
}

/// Decode the raw `config` blob of a challenge request.
///
/// A missing blob (or a JSON `null`) is not an error and yields the empty
/// configuration; credential checks happen later in the provider factory.
pub fn decode(raw: Option<&[u8]>) -> Result<ProviderConfig> {
    let Some(raw) = raw else {
        return Ok(ProviderConfig::default());
    };

    let config: Option<ProviderConfig> =
        serde_json::from_slice(raw).map_err(SolverError::ConfigDecode)?;

    Ok(config.unwrap_or_default())
}
