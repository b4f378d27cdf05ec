use std::sync::Arc;

use tcp_authz::TierAuthorizer;
use tcp_context::ContextResolver;
use tcp_provider::ProviderRegistry;
use tcp_store::StateStore;
use tcp_templates::TemplateRegistry;

use crate::dynamic::DynamicComponentStore;

/// Everything a handler needs: the state store and the four domain
/// collaborators (context resolver, provider registry, tier authorizer,
/// template registry) plus the dynamic-component side API, which has no
/// domain meaning of its own and lives entirely in this crate.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub context_resolver: Arc<ContextResolver>,
    pub providers: Arc<ProviderRegistry>,
    pub authorizer: Arc<TierAuthorizer>,
    pub templates: Arc<TemplateRegistry>,
    pub dynamic_components: Arc<DynamicComponentStore>,
}
