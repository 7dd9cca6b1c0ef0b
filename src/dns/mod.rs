mod cloudflare;
mod factory;
mod provider;

pub use cloudflare::{CloudflareConstructor, CloudflareProvider, DEFAULT_BASE_URL};
pub use factory::ProviderFactory;
pub use provider::{ChallengeProvider, ProviderConstructor, ProviderError, ProviderParams};

/// Public recursive resolvers handed to provider clients by default.
pub const RECURSIVE_NAMESERVERS: &[&str] = &["8.8.8.8:53", "8.8.4.4:53"];
