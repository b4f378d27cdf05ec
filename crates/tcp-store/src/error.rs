use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource '{name}' not found at {context_path}")]
    ResourceNotFound { context_path: String, name: String },

    #[error("plan '{0}' not found")]
    PlanNotFound(String),

    #[error("lock conflict on {context_path}: held by '{holder}'")]
    LockConflict { context_path: String, holder: String },

    #[error("lock on {context_path} is no longer held by '{holder}'")]
    LockNotOwned { context_path: String, holder: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}

impl From<StoreError> for tcp_domain::DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ResourceNotFound { context_path, name } => {
                tcp_domain::DomainError::ResourceNotFound { context_path, name }
            }
            StoreError::LockConflict { context_path, holder } => {
                tcp_domain::DomainError::LockConflict { context_path, holder_id: holder }
            }
            other => tcp_domain::DomainError::Internal(other.to_string()),
        }
    }
}
