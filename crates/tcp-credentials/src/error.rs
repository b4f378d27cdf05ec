use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential '{0}' not found")]
    NotFound(String),

    #[error("credential '{0}' has expired")]
    Expired(String),

    #[error("credential '{0}' is not renewable")]
    NotRenewable(String),
}
