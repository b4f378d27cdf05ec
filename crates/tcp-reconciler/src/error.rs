use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("domain error: {0}")]
    Domain(#[from] tcp_domain::DomainError),

    #[error("store error: {0}")]
    Store(#[from] tcp_store::StoreError),
}
