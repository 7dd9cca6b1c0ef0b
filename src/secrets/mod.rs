mod kube_store;
mod resolver;
mod store;

pub use kube_store::KubeSecretStore;
pub use resolver::CredentialResolver;
pub use store::{Secret, SecretStore, SecretStoreError};
