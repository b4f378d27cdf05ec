use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tcp_authz::TierAuthorizer;
use tcp_context::ContextResolver;
use tcp_domain::{CapabilityDeclaration, Plan};
use tcp_provider::{AwsProvider, DockerComposeProvider, LocalProvider, ProviderRegistry};
use tcp_store::{InMemoryStore, StateStore};
use tcp_templates::TemplateRegistry;

use crate::cli::{GraphOutput, TierArg};
use crate::output;

fn authed_client(role: &str) -> Result<Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-tcp-role", role.parse().context("invalid role header value")?);
    Ok(Client::builder().default_headers(headers).build()?)
}

// ── Serve ─────────────────────────────────────────────────────────────────

pub async fn serve(bind: String, port: u16, provider: String) -> Result<()> {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    let context_resolver = Arc::new(ContextResolver::new(store.clone()));

    let mut registry = ProviderRegistry::new(provider);
    registry.register(Arc::new(LocalProvider::new()));
    registry.register(Arc::new(AwsProvider::new()));
    registry.register(Arc::new(DockerComposeProvider::new()));

    let app = tcp_api::build_app(
        store,
        context_resolver,
        Arc::new(registry),
        Arc::new(TierAuthorizer::new()),
        Arc::new(TemplateRegistry::new()),
    );

    let addr = format!("{bind}:{port}");
    println!("Starting tcpctl API server on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

// ── Plan ──────────────────────────────────────────────────────────────────

pub async fn plan(
    url: String,
    role: String,
    tier: TierArg,
    org: String,
    env: String,
    app: Option<String>,
    declarations_path: PathBuf,
    provider: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(&declarations_path)
        .with_context(|| format!("failed to read {}", declarations_path.display()))?;
    let declarations: Vec<CapabilityDeclaration> =
        serde_json::from_str(&raw).context("declarations file must be a JSON array of capability declarations")?;

    let body = json!({
        "org": org,
        "env": env,
        "app": app,
        "provider": provider,
        "dry_run": dry_run,
        "declarations": declarations,
    });

    let client = authed_client(&role)?;
    let resp = client
        .post(format!("{}/api/v1/platform/{}/plans", url.trim_end_matches('/'), tier.segment()))
        .json(&body)
        .send()
        .await
        .with_context(|| format!("failed to reach server at {url}"))?;

    let status = resp.status();
    let plan: serde_json::Value = resp.json().await.context("failed to parse plan response")?;
    if !status.is_success() {
        anyhow::bail!("plan request failed ({status}): {plan}");
    }
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

// ── Approve ───────────────────────────────────────────────────────────────

pub async fn approve(url: String, role: String, tier: TierArg, plan_id: String, approved_by: String) -> Result<()> {
    let client = authed_client(&role)?;
    let resp = client
        .post(format!(
            "{}/api/v1/platform/{}/plans/{}/approve",
            url.trim_end_matches('/'),
            tier.segment(),
            plan_id,
        ))
        .json(&json!({ "approved_by": approved_by }))
        .send()
        .await
        .with_context(|| format!("failed to reach server at {url}"))?;

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.context("failed to parse approve response")?;
    if !status.is_success() {
        anyhow::bail!("approve failed ({status}): {body}");
    }
    println!("Plan {} approved.", plan_id);
    Ok(())
}

// ── Apply ─────────────────────────────────────────────────────────────────

pub async fn apply(url: String, role: String, tier: TierArg, plan_id: String) -> Result<()> {
    let client = authed_client(&role)?;
    let resp = client
        .post(format!(
            "{}/api/v1/platform/{}/plans/{}/apply",
            url.trim_end_matches('/'),
            tier.segment(),
            plan_id,
        ))
        .send()
        .await
        .with_context(|| format!("failed to reach server at {url}"))?;

    let status = resp.status();
    let plan: Plan = match resp.json().await {
        Ok(plan) => plan,
        Err(_) => anyhow::bail!("apply failed ({status}): could not parse response"),
    };
    if !status.is_success() {
        anyhow::bail!("apply failed ({status}): plan is now {:?}", plan.status);
    }
    println!("{}", output::render_plan_text(&plan));
    Ok(())
}

// ── Graph ─────────────────────────────────────────────────────────────────

pub async fn graph(url: String, role: String, tier: TierArg, plan_id: String, format: GraphOutput) -> Result<()> {
    let client = authed_client(&role)?;
    let resp = client
        .get(format!(
            "{}/api/v1/platform/{}/plans/{}",
            url.trim_end_matches('/'),
            tier.segment(),
            plan_id,
        ))
        .send()
        .await
        .with_context(|| format!("failed to reach server at {url}"))?;

    let plan: Plan = resp.json().await.context("failed to parse plan response")?;
    match format {
        GraphOutput::Text => print!("{}", output::render_plan_text(&plan)),
        GraphOutput::Dot => println!("{}", output::render_plan_dot(&plan)),
    }
    Ok(())
}

// ── Reconcile ─────────────────────────────────────────────────────────────

pub async fn reconcile(
    url: String,
    role: String,
    tier: TierArg,
    org: String,
    env: String,
    app: Option<String>,
    provider: Option<String>,
) -> Result<()> {
    let client = authed_client(&role)?;
    let mut request = client.post(format!(
        "{}/api/v1/platform/{}/reconcile",
        url.trim_end_matches('/'),
        tier.segment(),
    ));
    request = request.query(&[("org", org.as_str()), ("env", env.as_str())]);
    if let Some(app) = &app {
        request = request.query(&[("app", app.as_str())]);
    }
    if let Some(provider) = &provider {
        request = request.query(&[("provider", provider.as_str())]);
    }

    let resp = request.send().await.with_context(|| format!("failed to reach server at {url}"))?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.context("failed to parse reconcile response")?;
    if !status.is_success() {
        anyhow::bail!("reconcile failed ({status}): {body}");
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

// ── Status ────────────────────────────────────────────────────────────────

pub async fn status(url: String, role: String, tier: TierArg, org: String, env: String, app: Option<String>) -> Result<()> {
    let client = authed_client(&role)?;
    let mut request = client.get(format!(
        "{}/api/v1/platform/{}/resources",
        url.trim_end_matches('/'),
        tier.segment(),
    ));
    request = request.query(&[("org", org.as_str()), ("env", env.as_str())]);
    if let Some(app) = &app {
        request = request.query(&[("app", app.as_str())]);
    }

    let resources: Vec<serde_json::Value> = request
        .send()
        .await
        .with_context(|| format!("failed to reach server at {url}"))?
        .json()
        .await
        .context("failed to parse resources response")?;

    println!("Resources: {}", resources.len());
    for resource in &resources {
        let name = resource.get("name").and_then(|v| v.as_str()).unwrap_or("-");
        let status = resource.get("status").and_then(|v| v.as_str()).unwrap_or("-");
        let abstract_type = resource.get("abstractType").and_then(|v| v.as_str()).unwrap_or("-");
        println!("  {name:<24} {abstract_type:<20} {status}");
    }
    Ok(())
}
