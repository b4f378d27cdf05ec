use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tcp_domain::{CapabilityDeclaration, ContextPath, PropertyValue, Tier};
use tcp_store::StoreError;
use uuid::Uuid;

use crate::dynamic::DynamicComponentInput;
use crate::error::ApiError;
use crate::state::AppState;

fn parse_tier(segment: &str) -> Result<Tier, ApiError> {
    Tier::from_segment(segment).ok_or_else(|| ApiError::bad_request(format!("unknown tier '{}'", segment)))
}

fn parse_plan_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::bad_request(format!("invalid plan id '{}'", id)))
}

/// The tier-qualified state-store partition key for `(org, env, app)` at
/// `tier`, mirroring `PlatformContext::context_path` — tiers 1/2 never
/// carry an app segment even if one was supplied.
fn context_path_for(org: &str, env: &str, app: Option<&str>, tier: Tier) -> String {
    let app = if tier == Tier::Application { app } else { None };
    ContextPath::new(org, env, app).tier_qualified(tier)
}

// ── Health ────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.list_resources("__health__").await?;
    Ok(StatusCode::OK)
}

// ── Plans ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub org: String,
    pub env: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    pub declarations: Vec<CapabilityDeclaration>,
}

pub async fn post_plan(
    State(state): State<AppState>,
    Path(tier_segment): Path<String>,
    Json(body): Json<PlanRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tier = parse_tier(&tier_segment)?;
    let provider = state.providers.resolve(body.provider.as_deref())?;

    let context = state
        .context_resolver
        .resolve_context(&body.org, &body.env, body.app.as_deref(), tier)
        .await?;

    let violations = state.context_resolver.validate_tier_boundary(&context, &body.declarations)?;
    if !violations.is_empty() {
        return Err(ApiError::constraint_violations(violations));
    }

    let plan = tcp_provider::build_plan(&context, &body.declarations, provider.as_ref(), body.dry_run).await?;
    state.store.save_plan(&plan).await?;
    Ok((StatusCode::CREATED, Json(json!(plan))))
}

#[derive(Debug, Deserialize)]
pub struct ListPlansQuery {
    pub org: String,
    pub env: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn list_plans(
    State(state): State<AppState>,
    Path(tier_segment): Path<String>,
    Query(q): Query<ListPlansQuery>,
) -> Result<Json<Value>, ApiError> {
    let tier = parse_tier(&tier_segment)?;
    let path = context_path_for(&q.org, &q.env, q.app.as_deref(), tier);
    let plans = state.store.list_plans(&path, q.limit.unwrap_or(50)).await?;
    Ok(Json(json!(plans)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path((_tier_segment, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let plan = state.store.get_plan(parse_plan_id(&id)?).await?;
    Ok(Json(json!(plan)))
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approved_by: String,
}

pub async fn approve_plan(
    State(state): State<AppState>,
    Path((_tier_segment, id)): Path<(String, String)>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut plan = state.store.get_plan(parse_plan_id(&id)?).await?;
    plan.approve(body.approved_by, Utc::now());
    state.store.save_plan(&plan).await?;
    Ok(Json(json!(plan)))
}

pub async fn apply_plan(
    State(state): State<AppState>,
    Path((_tier_segment, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let mut plan = state.store.get_plan(parse_plan_id(&id)?).await?;
    let provider = state.providers.get(&plan.provider)?;
    tcp_provider::apply_plan(&mut plan, provider.as_ref()).await?;
    Ok(Json(json!(plan)))
}

// ── Resources ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub org: String,
    pub env: String,
    #[serde(default)]
    pub app: Option<String>,
}

pub async fn list_resources(
    State(state): State<AppState>,
    Path(tier_segment): Path<String>,
    Query(q): Query<ContextQuery>,
) -> Result<Json<Value>, ApiError> {
    let tier = parse_tier(&tier_segment)?;
    let path = context_path_for(&q.org, &q.env, q.app.as_deref(), tier);
    let resources = state.store.list_resources(&path).await?;
    Ok(Json(json!(resources)))
}

/// Idempotent: deleting a resource that is already gone is success, same as
/// the driver-level contract (spec §7).
pub async fn delete_resource(
    State(state): State<AppState>,
    Path((tier_segment, name)): Path<(String, String)>,
    Query(q): Query<ContextQuery>,
) -> Result<StatusCode, ApiError> {
    let tier = parse_tier(&tier_segment)?;
    let path = context_path_for(&q.org, &q.env, q.app.as_deref(), tier);
    match state.store.delete_resource(&path, &name).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::ResourceNotFound { .. }) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into()),
    }
}

// ── Reconcile ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReconcileQuery {
    pub org: String,
    pub env: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

pub async fn post_reconcile(
    State(state): State<AppState>,
    Path(tier_segment): Path<String>,
    Query(q): Query<ReconcileQuery>,
) -> Result<Json<Value>, ApiError> {
    let tier = parse_tier(&tier_segment)?;
    let path = context_path_for(&q.org, &q.env, q.app.as_deref(), tier);
    let provider = state.providers.resolve(q.provider.as_deref())?;
    let result = tcp_reconciler::reconcile(&path, state.store.clone(), provider).await?;
    Ok(Json(json!(result)))
}

// ── Templates ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveTemplateRequest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub params: BTreeMap<String, PropertyValue>,
}

pub async fn resolve_template(
    State(state): State<AppState>,
    Path((_tier_segment, name)): Path<(String, String)>,
    Json(body): Json<ResolveTemplateRequest>,
) -> Result<Json<Value>, ApiError> {
    let declarations = state.templates.resolve(&name, &body.version, &body.params)?;
    Ok(Json(json!(declarations)))
}

// ── Dynamic components ──────────────────────────────────────────────────────

pub async fn list_dynamic_components(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.dynamic_components.list().await))
}

pub async fn create_dynamic_component(
    State(state): State<AppState>,
    Json(input): Json<DynamicComponentInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let component = state.dynamic_components.create(input).await?;
    Ok((StatusCode::CREATED, Json(json!(component))))
}

pub async fn get_dynamic_component(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .dynamic_components
        .get(&id)
        .await
        .map(|c| Json(json!(c)))
        .ok_or_else(|| ApiError::not_found(format!("dynamic component '{}' not found", id)))
}

pub async fn update_dynamic_component(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<DynamicComponentInput>,
) -> Result<Json<Value>, ApiError> {
    let component = state.dynamic_components.update(&id, input).await?;
    Ok(Json(json!(component)))
}

pub async fn delete_dynamic_component(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.dynamic_components.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
