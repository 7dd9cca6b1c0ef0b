mod ace;
mod payload;

pub use ace::{normalize_zone, AceSolver, SOLVER_NAME};
pub use payload::{
    ChallengeAction, ChallengePayload, ChallengeRequest, ChallengeResponse, ResponseStatus,
};

use async_trait::async_trait;

use crate::config::HostConfig;
use crate::error::Result;

/// The contract a DNS-01 webhook host drives.
///
/// `initialize` runs once at process start; `present` and `clean_up` may be
/// called concurrently for unrelated challenges.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Identifier the host routes challenge requests by
    fn name(&self) -> &'static str;

    fn initialize(host: &HostConfig) -> Result<Self>
    where
        Self: Sized;

    async fn present(&self, ch: &ChallengeRequest) -> Result<()>;

    async fn clean_up(&self, ch: &ChallengeRequest) -> Result<()>;
}
