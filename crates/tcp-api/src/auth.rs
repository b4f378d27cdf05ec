use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tcp_authz::Operation;
use tcp_domain::Tier;

use crate::state::AppState;

/// Header carrying the caller's role for tier-qualified requests. Absence
/// on a tier-qualified path is a 401, per spec; requests with no
/// tier-qualified segment never look at this header at all.
const ROLE_HEADER: &str = "x-tcp-role";

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized", "code": 401, "message": message })),
    )
        .into_response()
}

fn forbidden(message: String) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Forbidden", "code": 403, "message": message })),
    )
        .into_response()
}

/// Detects a tier-qualified path segment (`tier1`/`tier2`/`tier3` or
/// `infrastructure`/`shared-primitive`/`application`) and, when present,
/// authorizes the request's role against the tier and the HTTP-method-
/// derived operation before letting it through. Paths with no such segment
/// (the dynamic-component side API, health checks) pass through untouched.
pub async fn tier_authorization(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(tier) = request.uri().path().split('/').find_map(Tier::from_segment) else {
        return next.run(request).await;
    };

    let Some(role) = request.headers().get(ROLE_HEADER).and_then(|v| v.to_str().ok()) else {
        return unauthorized("missing role header");
    };
    let role = role.to_string();

    let Some(operation) = Operation::from_http_method(request.method().as_str()) else {
        return next.run(request).await;
    };

    match state.authorizer.authorize(&role, tier, operation) {
        Ok(()) => next.run(request).await,
        Err(e) => forbidden(e.to_string()),
    }
}
