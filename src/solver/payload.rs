use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::SolverError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One DNS-01 challenge as sent by the webhook host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub action: ChallengeAction,
    #[serde(rename = "type", default)]
    pub challenge_type: String,
    #[serde(default)]
    pub dns_name: String,
    /// TXT record value
    #[serde(default)]
    pub key: String,
    /// Namespace secret references in `config` are resolved in
    #[serde(default)]
    pub resource_namespace: String,
    #[serde(rename = "resolvedFQDN", default)]
    pub resolved_fqdn: String,
    #[serde(default)]
    pub resolved_zone: String,
    #[serde(default)]
    pub allow_ambient_credentials: bool,
    /// Issuer-provided solver config, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Box<RawValue>>,
}

impl ChallengeRequest {
    pub fn config_bytes(&self) -> Option<&[u8]> {
        self.config.as_deref().map(|raw| raw.get().as_bytes())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub status: String,
    pub message: String,
    pub reason: String,
    pub code: u16,
}

impl ChallengeResponse {
    pub fn success(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            success: true,
            status: None,
        }
    }

    pub fn failure(uid: impl Into<String>, err: &SolverError) -> Self {
        Self {
            uid: uid.into(),
            success: false,
            status: Some(ResponseStatus {
                status: "Failure".to_string(),
                message: err.to_string(),
                reason: err.kind().to_string(),
                code: 500,
            }),
        }
    }

    pub fn bad_request(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            success: false,
            status: Some(ResponseStatus {
                status: "Failure".to_string(),
                message: message.into(),
                reason: "BadRequest".to_string(),
                code: 400,
            }),
        }
    }
}

/// Envelope exchanged with the host; requests come in with `request` set and
/// go back with `response` filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}
