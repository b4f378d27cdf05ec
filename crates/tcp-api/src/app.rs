use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tcp_authz::TierAuthorizer;
use tcp_context::ContextResolver;
use tcp_provider::ProviderRegistry;
use tcp_store::StateStore;
use tcp_templates::TemplateRegistry;
use tower_http::trace::TraceLayer;

use crate::auth::tier_authorization;
use crate::dynamic::DynamicComponentStore;
use crate::handlers;
use crate::state::AppState;

pub fn build_app(
    store: Arc<dyn StateStore>,
    context_resolver: Arc<ContextResolver>,
    providers: Arc<ProviderRegistry>,
    authorizer: Arc<TierAuthorizer>,
    templates: Arc<TemplateRegistry>,
) -> Router {
    let state = AppState {
        store,
        context_resolver,
        providers,
        authorizer,
        templates,
        dynamic_components: Arc::new(DynamicComponentStore::new()),
    };

    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        // Plans
        .route("/api/v1/platform/:tier/plans", post(handlers::post_plan).get(handlers::list_plans))
        .route("/api/v1/platform/:tier/plans/:id", get(handlers::get_plan))
        .route("/api/v1/platform/:tier/plans/:id/approve", post(handlers::approve_plan))
        .route("/api/v1/platform/:tier/plans/:id/apply", post(handlers::apply_plan))
        // Resources
        .route("/api/v1/platform/:tier/resources", get(handlers::list_resources))
        .route("/api/v1/platform/:tier/resources/:name", axum::routing::delete(handlers::delete_resource))
        // Reconcile
        .route("/api/v1/platform/:tier/reconcile", post(handlers::post_reconcile))
        // Templates
        .route("/api/v1/platform/:tier/templates/:name/resolve", post(handlers::resolve_template))
        // Dynamic-component side API: no tier-qualified segment, so the
        // authorization middleware passes these straight through.
        .route(
            "/api/dynamic/components",
            get(handlers::list_dynamic_components).post(handlers::create_dynamic_component),
        )
        .route(
            "/api/dynamic/components/:id",
            get(handlers::get_dynamic_component)
                .put(handlers::update_dynamic_component)
                .delete(handlers::delete_dynamic_component),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), tier_authorization))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tcp_provider::LocalProvider;
    use tcp_store::InMemoryStore;
    use tower::util::ServiceExt;

    fn test_app() -> Router {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let context_resolver = Arc::new(ContextResolver::new(store.clone()));
        let mut registry = ProviderRegistry::new("local");
        registry.register(Arc::new(LocalProvider::new()));
        build_app(
            store,
            context_resolver,
            Arc::new(registry),
            Arc::new(TierAuthorizer::new()),
            Arc::new(TemplateRegistry::new()),
        )
    }

    #[tokio::test]
    async fn health_needs_no_role() {
        let app = test_app();
        let resp = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_returns_200_with_empty_store() {
        let app = test_app();
        let resp = app.oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tier_qualified_request_without_role_is_401() {
        let app = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/api/v1/platform/tier1/resources?org=acme&env=prod").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn viewer_posting_a_plan_is_403() {
        let app = test_app();
        let body = json!({ "org": "acme", "env": "prod", "declarations": [] });
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/platform/tier1/plans")
                    .header("content-type", "application/json")
                    .header("x-tcp-role", "tier_viewer")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_can_build_a_plan() {
        let app = test_app();
        let body = json!({
            "org": "acme",
            "env": "prod",
            "declarations": [{ "name": "net", "type": "network", "tier": "infrastructure" }],
        });
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/platform/tier1/plans")
                    .header("content-type", "application/json")
                    .header("x-tcp-role", "tier_admin")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn dynamic_components_bypass_tier_authorization() {
        let app = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/api/dynamic/components").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_tier_segment_passes_through_to_404() {
        let app = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/no/such/route").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
