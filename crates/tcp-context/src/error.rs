use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("tier must be 1, 2, or 3")]
    InvalidTier,

    #[error("tier boundary violation: {0}")]
    TierBoundary(String),

    #[error("constraint violations: {0:?}")]
    ConstraintViolations(Vec<tcp_domain::ConstraintViolation>),

    #[error(transparent)]
    Store(#[from] tcp_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
