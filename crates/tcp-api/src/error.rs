use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tcp_domain::{ConstraintViolation, DomainError};

/// Uniform error body for every non-2xx response: `{error, code, message}`,
/// matching the shape the tier-authorization middleware returns on denial.
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::UNPROCESSABLE_ENTITY, message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }

    /// A declaration set that failed `ValidateTierBoundary`'s constraint
    /// pass. Reports every violation at once rather than the first —
    /// mirrors the "never short-circuit" propagation rule the validator
    /// itself follows.
    pub fn constraint_violations(violations: Vec<ConstraintViolation>) -> Self {
        let detail = violations.iter().map(|v| v.message.clone()).collect::<Vec<_>>().join("; ");
        ApiError { status: StatusCode::UNPROCESSABLE_ENTITY, message: detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.status.canonical_reason().unwrap_or("Error"),
            "code": self.status.as_u16(),
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::ConstraintViolation(_) | DomainError::FidelityGap { .. } | DomainError::TierBoundary(_) => {
                ApiError::unprocessable(e.to_string())
            }
            DomainError::ResourceNotFound { .. } | DomainError::ContextNotFound { .. } => {
                ApiError::not_found(e.to_string())
            }
            DomainError::PlanConflict { .. } | DomainError::LockConflict { .. } => {
                ApiError { status: StatusCode::CONFLICT, message: e.to_string() }
            }
            DomainError::PlanNotApproved { .. } | DomainError::PlanAlreadyApplied { .. } | DomainError::PlanExpired { .. } => {
                ApiError::bad_request(e.to_string())
            }
            DomainError::CapabilityUnsupported { .. } | DomainError::NotScalable { .. } | DomainError::ResourceDriverNotFound { .. } => {
                ApiError::unprocessable(e.to_string())
            }
            DomainError::ProviderNotInitialized(_) | DomainError::InvalidConfig(_) | DomainError::Internal(_) => {
                ApiError::internal(e.to_string())
            }
        }
    }
}

impl From<tcp_store::StoreError> for ApiError {
    fn from(e: tcp_store::StoreError) -> Self {
        ApiError::from(DomainError::from(e))
    }
}

impl From<tcp_context::ContextError> for ApiError {
    fn from(e: tcp_context::ContextError) -> Self {
        match e {
            tcp_context::ContextError::TierBoundary(_) | tcp_context::ContextError::InvalidTier => {
                ApiError::unprocessable(e.to_string())
            }
            tcp_context::ContextError::ConstraintViolations(violations) => ApiError::constraint_violations(violations),
            tcp_context::ContextError::Store(store_err) => ApiError::from(store_err),
            tcp_context::ContextError::Serialization(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<tcp_reconciler::ReconcileError> for ApiError {
    fn from(e: tcp_reconciler::ReconcileError) -> Self {
        match e {
            tcp_reconciler::ReconcileError::Domain(domain_err) => ApiError::from(domain_err),
            tcp_reconciler::ReconcileError::Store(store_err) => ApiError::from(store_err),
        }
    }
}

impl From<tcp_templates::TemplateError> for ApiError {
    fn from(e: tcp_templates::TemplateError) -> Self {
        match e {
            tcp_templates::TemplateError::NotFound(_) | tcp_templates::TemplateError::NoVersions { .. } => {
                ApiError::not_found(e.to_string())
            }
            _ => ApiError::unprocessable(e.to_string()),
        }
    }
}
