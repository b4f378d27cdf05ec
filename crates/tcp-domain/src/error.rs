use thiserror::Error;

/// Semantic error kinds shared by every layer of the control plane. Kept as
/// one flat enum (rather than per-crate nominal errors) so that callers at
/// the HTTP boundary can match on kind without knowing which crate raised
/// it. Context (context path, tier, resource name) is carried inline in the
/// variants that need it for operator diagnosis, per the propagation rules.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("constraint violation(s): {0:?}")]
    ConstraintViolation(Vec<crate::constraint::ConstraintViolation>),

    #[error("fidelity gap for capability '{capability}': {gaps:?}")]
    FidelityGap {
        capability: String,
        gaps: Vec<crate::fidelity::FidelityGap>,
    },

    #[error("tier boundary violation: {0}")]
    TierBoundary(String),

    #[error("resource '{name}' not found at {context_path}")]
    ResourceNotFound { context_path: String, name: String },

    #[error("plan conflict on {context_path}: {reason}")]
    PlanConflict { context_path: String, reason: String },

    #[error("no resource driver registered for provider type '{provider_type}'")]
    ResourceDriverNotFound { provider_type: String },

    #[error("lock conflict on {context_path}: held by '{holder_id}'")]
    LockConflict { context_path: String, holder_id: String },

    #[error("capability '{capability_type}' is unsupported by provider '{provider}'")]
    CapabilityUnsupported { capability_type: String, provider: String },

    #[error("resource '{name}' ({provider_type}) is not scalable")]
    NotScalable { name: String, provider_type: String },

    #[error("plan {plan_id} is not approved")]
    PlanNotApproved { plan_id: String },

    #[error("plan {plan_id} was already applied")]
    PlanAlreadyApplied { plan_id: String },

    #[error("plan {plan_id} has expired")]
    PlanExpired { plan_id: String },

    #[error("context not found for {context_path} (tier {tier})")]
    ContextNotFound { context_path: String, tier: String },

    #[error("provider '{0}' is not initialized")]
    ProviderNotInitialized(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// True for errors the caller may retry without changing anything
    /// (lock conflicts clear on their own once the TTL elapses or the
    /// holder releases).
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::LockConflict { .. })
    }
}
