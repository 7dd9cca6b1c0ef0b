use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::provider::{ChallengeProvider, ProviderConstructor, ProviderError, ProviderParams};

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TXT_TTL: u32 = 120;
// "An identical record already exists."
const RECORD_EXISTS_CODE: u32 = 81057;

enum Auth {
    Token(String),
    Key { email: String, key: String },
}

pub struct CloudflareProvider {
    client: Client,
    base_url: String,
    auth: Auth,
    nameservers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CloudflareError>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    code: u32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RecordId {
    id: String,
}

impl CloudflareProvider {
    pub fn new(params: ProviderParams) -> Result<Self, ProviderError> {
        let auth = if !params.api_token.is_empty() {
            Auth::Token(params.api_token)
        } else if !params.api_key.is_empty() {
            if params.email.is_empty() {
                return Err(ProviderError::EmailRequired);
            }
            Auth::Key {
                email: params.email,
                key: params.api_key,
            }
        } else {
            return Err(ProviderError::MissingCredentials);
        };

        let base_url = match params.base_url.filter(|url| !url.is_empty()) {
            Some(url) => {
                validate_base_url(&url)?;
                url.trim_end_matches('/').to_string()
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if !params.user_agent.is_empty() {
            builder = builder.user_agent(params.user_agent);
        }
        let client = builder.build().map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            base_url,
            auth,
            nameservers: params.nameservers,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Token(token) => request.bearer_auth(token),
            Auth::Key { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    async fn zone_id(&self, zone: &str) -> Result<String, ProviderError> {
        let url = format!("{}/zones", self.base_url);
        debug!(zone, "Looking up zone id");

        let response = self
            .authorize(self.client.get(&url).query(&[("name", zone)]))
            .send()
            .await?;

        let zones: Vec<Zone> = read_result(response).await?.unwrap_or_default();

        zones
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| ProviderError::ZoneNotFound(zone.to_string()))
    }
}

fn validate_base_url(url: &str) -> Result<(), ProviderError> {
    let parsed = Url::parse(url).map_err(|e| ProviderError::InvalidBaseUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ProviderError::InvalidBaseUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {:?}", scheme),
        }),
    }
}

/// Record names are sent without the trailing root dot.
fn record_name(fqdn: &str) -> &str {
    fqdn.strip_suffix('.').unwrap_or(fqdn)
}

async fn read_result<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<CloudflareResponse<T>>(&body) {
        Ok(parsed) if parsed.success && status.is_success() => Ok(parsed.result),
        Ok(parsed) => {
            let code = parsed.errors.first().map(|e| e.code);
            let message = if parsed.errors.is_empty() {
                format!("HTTP {}", status)
            } else {
                parsed
                    .errors
                    .iter()
                    .map(|e| format!("[{}] {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            Err(ProviderError::Api {
                status: status.as_u16(),
                code,
                message,
            })
        }
        Err(_) => Err(ProviderError::Api {
            status: status.as_u16(),
            code: None,
            message: body,
        }),
    }
}

#[async_trait]
impl ChallengeProvider for CloudflareProvider {
    async fn present(&self, zone: &str, fqdn: &str, value: &str) -> Result<(), ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let name = record_name(fqdn);

        let payload = CreateRecordRequest {
            record_type: "TXT",
            name,
            content: value,
            ttl: TXT_TTL,
        };

        let response = self
            .authorize(self.client.post(self.records_url(&zone_id)).json(&payload))
            .send()
            .await?;

        match read_result::<RecordId>(response).await {
            Ok(record) => {
                let record_id = record.map(|r| r.id).unwrap_or_default();
                info!(fqdn, zone, record_id = %record_id, "Created TXT record");
                Ok(())
            }
            Err(ProviderError::Api {
                code: Some(RECORD_EXISTS_CODE),
                ..
            }) => {
                info!(fqdn, zone, "TXT record already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn clean_up(&self, zone: &str, fqdn: &str, value: &str) -> Result<(), ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let name = record_name(fqdn);
        let records_url = self.records_url(&zone_id);

        let response = self
            .authorize(self.client.get(&records_url).query(&[
                ("type", "TXT"),
                ("name", name),
                ("content", value),
            ]))
            .send()
            .await?;

        let records: Vec<RecordId> = read_result(response).await?.unwrap_or_default();
        if records.is_empty() {
            debug!(fqdn, zone, "No TXT record to clean up");
            return Ok(());
        }

        for record in records {
            let response = self
                .authorize(
                    self.client
                        .delete(format!("{}/{}", records_url, record.id)),
                )
                .send()
                .await?;
            read_result::<RecordId>(response).await?;
            info!(fqdn, zone, record_id = %record.id, "Deleted TXT record");
        }

        Ok(())
    }

    fn nameservers(&self) -> &[String] {
        &self.nameservers
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Builds [`CloudflareProvider`] clients for the solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudflareConstructor;

impl ProviderConstructor for CloudflareConstructor {
    fn construct(&self, params: ProviderParams) -> Result<Box<dyn ChallengeProvider>, ProviderError> {
        Ok(Box::new(CloudflareProvider::new(params)?))
    }
}
