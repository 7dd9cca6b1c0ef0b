mod host;
mod settings;
mod solver;

pub use host::HostConfig;
pub use settings::{LogFormat, SecretStoreSettings, ServerConfig, Settings, SolverSettings};
pub use solver::{decode, ProviderConfig, SecretKeySelector};
