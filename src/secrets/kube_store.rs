use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Certificate, Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::store::{Secret, SecretStore, SecretStoreError};
use crate::config::HostConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Secret store backed by the Kubernetes core/v1 Secrets API.
pub struct KubeSecretStore {
    client: Client,
    api_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SecretObject {
    #[serde(default)]
    data: HashMap<String, String>,
}

impl KubeSecretStore {
    pub fn new(config: &HostConfig) -> Result<Self, SecretStoreError> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);

        if !config.user_agent.is_empty() {
            builder = builder.user_agent(config.user_agent.clone());
        }

        if let Some(pem) = &config.ca_pem {
            let cert = Certificate::from_pem(pem).map_err(SecretStoreError::Client)?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(SecretStoreError::Client)?;

        let api_url = Url::parse(&config.api_url).map_err(|e| SecretStoreError::InvalidUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(SecretStoreError::InvalidUrl {
                url: config.api_url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        Ok(Self {
            client,
            api_url,
            token: config.token.clone(),
        })
    }

    /// Each segment is percent-encoded, so `?`, `#` or `/` in a name never
    /// address a different resource.
    fn secret_url(&self, namespace: &str, name: &str) -> Url {
        let mut url = self.api_url.clone();
        // cannot_be_a_base URLs are rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v1", "namespaces", namespace, "secrets", name]);
        }
        url
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, SecretStoreError> {
        // An empty name would hit the LIST endpoint instead of a single secret
        if !is_valid_segment(namespace) || !is_valid_segment(name) {
            debug!(namespace, name, "Refusing to fetch secret with empty or relative name");
            return Err(SecretStoreError::NotFound);
        }

        let url = self.secret_url(namespace, name);
        debug!(namespace, name, "Fetching secret");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SecretStoreError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SecretStoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let object: SecretObject = response
            .json()
            .await
            .map_err(|e| SecretStoreError::Decode(e.to_string()))?;

        let mut data = HashMap::with_capacity(object.data.len());
        for (key, encoded) in object.data {
            let value = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| SecretStoreError::Decode(format!("key {:?}: {}", key, e)))?;
            data.insert(key, value);
        }

        Ok(Secret { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer, token: Option<&str>) -> KubeSecretStore {
        KubeSecretStore::new(&HostConfig {
            api_url: format!("{}/", server.uri()),
            token: token.map(str::to_string),
            ca_pem: None,
            user_agent: "ace-webhook/test".to_string(),
            nameservers: Vec::new(),
            call_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_decodes_secret_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns1/secrets/cf-creds"))
            .and(header("authorization", "Bearer sa-token"))
            .and(header("user-agent", "ace-webhook/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": {"name": "cf-creds", "namespace": "ns1"},
                "data": {"token": STANDARD.encode("tok-xyz")}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let secret = store_for(&server, Some("sa-token"))
            .get("ns1", "cf-creds")
            .await
            .unwrap();

        assert_eq!(secret.data.get("token").map(Vec::as_slice), Some(b"tok-xyz".as_slice()));
    }

    #[tokio::test]
    async fn test_secret_without_data_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns1/secrets/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "Secret"
            })))
            .mount(&server)
            .await;

        let secret = store_for(&server, None).get("ns1", "empty").await.unwrap();
        assert!(secret.data.is_empty());
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns1/secrets/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "kind": "Status",
                "reason": "NotFound"
            })))
            .mount(&server)
            .await;

        let err = store_for(&server, None).get("ns1", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_name_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "SecretList",
                "items": []
            })))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_for(&server, None);
        for name in ["", ".", ".."] {
            let err = store.get("ns1", name).await.unwrap_err();
            assert!(err.is_not_found(), "name {:?} returned {:?}", name, err);
        }
        assert!(store.get("", "cf-creds").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_name_is_escaped_as_single_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns1/secrets/cf-creds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"token": STANDARD.encode("tok-xyz")}
            })))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = store_for(&server, None);
        for name in ["cf-creds?x=1", "cf-creds#frag", "other/cf-creds"] {
            let err = store.get("ns1", name).await.unwrap_err();
            assert!(err.is_not_found(), "name {:?} returned {:?}", name, err);
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        for request in &requests {
            assert!(request.url.query().is_none());
            assert!(request.url.fragment().is_none());
            assert!(request.url.path().starts_with("/api/v1/namespaces/ns1/secrets/"));
        }
        assert!(requests[0].url.path().ends_with("/secrets/cf-creds%3Fx=1"));
        assert!(requests[1].url.path().ends_with("/secrets/cf-creds%23frag"));
        assert!(requests[2].url.path().ends_with("/secrets/other%2Fcf-creds"));
    }

    #[tokio::test]
    async fn test_api_url_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/k8s/api/v1/namespaces/ns1/secrets/cf-creds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"token": STANDARD.encode("tok-xyz")}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = KubeSecretStore::new(&HostConfig {
            api_url: format!("{}/k8s", server.uri()),
            token: None,
            ca_pem: None,
            user_agent: String::new(),
            nameservers: Vec::new(),
            call_timeout: Duration::from_secs(5),
        })
        .unwrap();

        let secret = store.get("ns1", "cf-creds").await.unwrap();
        assert!(secret.data.contains_key("token"));
    }

    #[test]
    fn test_invalid_api_url_is_rejected() {
        let result = KubeSecretStore::new(&HostConfig {
            api_url: "not a url".to_string(),
            token: None,
            ca_pem: None,
            user_agent: String::new(),
            nameservers: Vec::new(),
            call_timeout: Duration::from_secs(5),
        });

        assert!(matches!(result, Err(SecretStoreError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_forbidden_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = store_for(&server, None).get("ns1", "cf-creds").await.unwrap_err();
        match err {
            SecretStoreError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_base64_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"token": "%%% not base64 %%%"}
            })))
            .mount(&server)
            .await;

        let err = store_for(&server, None).get("ns1", "cf-creds").await.unwrap_err();
        assert!(matches!(err, SecretStoreError::Decode(_)));
    }
}
