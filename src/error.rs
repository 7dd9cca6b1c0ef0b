use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::dns::ProviderError;
use crate::secrets::SecretStoreError;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Coarse classification of a solver failure.
///
/// The host uses this to decide whether to keep polling a challenge or give
/// up until somebody fixes the issuer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Initialization,
    ConfigDecode,
    AmbiguousCredentials,
    SecretLookup,
    MissingKey,
    ProviderInit,
    BackendOperation,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::SecretLookup | ErrorKind::BackendOperation | ErrorKind::DeadlineExceeded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Initialization => "Initialization",
            ErrorKind::ConfigDecode => "ConfigDecode",
            ErrorKind::AmbiguousCredentials => "AmbiguousCredentials",
            ErrorKind::SecretLookup => "SecretLookup",
            ErrorKind::MissingKey => "MissingKey",
            ErrorKind::ProviderInit => "ProviderInit",
            ErrorKind::BackendOperation => "BackendOperation",
            ErrorKind::DeadlineExceeded => "DeadlineExceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two challenge operations the host can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Present,
    CleanUp,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Present => write!(f, "present"),
            Operation::CleanUp => write!(f, "clean up"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("failed to initialize secret store client: {0}")]
    SecretStoreInit(#[source] SecretStoreError),

    #[error("error decoding solver config: {0}")]
    ConfigDecode(#[source] serde_json::Error),

    #[error("API key and API token secret references are both present")]
    AmbiguousCredentials,

    #[error("failed to load secret \"{namespace}/{name}\": {source}")]
    SecretLookup {
        namespace: String,
        name: String,
        #[source]
        source: SecretStoreError,
    },

    #[error("no key \"{key}\" in secret \"{namespace}/{name}\"")]
    MissingKey {
        key: String,
        namespace: String,
        name: String,
    },

    #[error("error instantiating ace challenge solver: {0}")]
    ProviderInit(#[source] ProviderError),

    #[error("failed to {operation} fqdn={fqdn} zone={zone}: {source}")]
    Backend {
        operation: Operation,
        fqdn: String,
        zone: String,
        #[source]
        source: ProviderError,
    },

    #[error("{operation} for fqdn={fqdn} zone={zone} did not finish within {timeout:?}")]
    DeadlineExceeded {
        operation: Operation,
        fqdn: String,
        zone: String,
        timeout: Duration,
    },

    #[error("failed to get client from ChallengeRequest (fqdn={fqdn} zone={zone}): {source}")]
    Client {
        fqdn: String,
        zone: String,
        #[source]
        source: Box<SolverError>,
    },
}

impl SolverError {
    /// Kind of the underlying failure, looking through context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::SecretStoreInit(_) => ErrorKind::Initialization,
            SolverError::ConfigDecode(_) => ErrorKind::ConfigDecode,
            SolverError::AmbiguousCredentials => ErrorKind::AmbiguousCredentials,
            SolverError::SecretLookup { .. } => ErrorKind::SecretLookup,
            SolverError::MissingKey { .. } => ErrorKind::MissingKey,
            SolverError::ProviderInit(_) => ErrorKind::ProviderInit,
            SolverError::Backend { .. } => ErrorKind::BackendOperation,
            SolverError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            SolverError::Client { source, .. } => source.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
