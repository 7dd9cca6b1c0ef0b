use std::time::Duration;

/// Process-wide connection settings handed to the solver at startup.
#[derive(Clone)]
pub struct HostConfig {
    /// Kubernetes API server, e.g. `https://10.96.0.1:443`.
    pub api_url: String,
    pub token: Option<String>,
    /// PEM bundle used to verify the API server certificate.
    pub ca_pem: Option<Vec<u8>>,
    pub user_agent: String,
    pub nameservers: Vec<String>,
    pub call_timeout: Duration,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.as_ref().map(|pem| pem.len()))
            .field("user_agent", &self.user_agent)
            .field("nameservers", &self.nameservers)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
