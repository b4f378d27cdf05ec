use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tcp_domain::{
    CapabilityDeclaration, Constraint, ConstraintViolation, ContextPath, PropertyValue,
    ResourceOutput, Tier, constraint::evaluate_all,
};
use tcp_store::StateStore;
use tracing::debug;

use crate::error::ContextError;

/// Name of the synthetic resource a tier's accumulated constraints are
/// encoded into, so child tiers can read them back via the state store
/// without a separate constraints table.
const CONSTRAINTS_RESOURCE: &str = "__constraints__";
const CONSTRAINTS_ABSTRACT_TYPE: &str = "tcp.constraints";

/// Everything a tier needs to validate and plan its declarations: the
/// resources its ancestor tiers produced, and the constraints they imposed.
#[derive(Debug, Clone)]
pub struct PlatformContext {
    pub org: String,
    pub env: String,
    pub app: Option<String>,
    pub tier: Tier,
    pub parent_outputs: BTreeMap<String, ResourceOutput>,
    pub constraints: Vec<Constraint>,
    pub credentials: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl PlatformContext {
    /// The canonical context path for this tier, e.g. `acme/prod` for
    /// tiers 1/2 or `acme/prod/web` for tier 3.
    pub fn context_path(&self) -> ContextPath {
        let app = if self.tier == Tier::Application {
            self.app.as_deref()
        } else {
            None
        };
        ContextPath::new(&self.org, &self.env, app)
    }
}

fn encode_constraints(constraints: &[Constraint]) -> BTreeMap<String, PropertyValue> {
    let items = constraints
        .iter()
        .map(|c| {
            let mut m = BTreeMap::new();
            m.insert("field".to_string(), PropertyValue::String(c.field.clone()));
            m.insert("operator".to_string(), PropertyValue::String(c.operator.clone()));
            m.insert("value".to_string(), c.value.clone());
            m.insert("source".to_string(), PropertyValue::String(c.source.clone()));
            PropertyValue::Map(m)
        })
        .collect();
    let mut props = BTreeMap::new();
    props.insert("items".to_string(), PropertyValue::List(items));
    props
}

fn decode_constraints(properties: &BTreeMap<String, PropertyValue>) -> Vec<Constraint> {
    let Some(PropertyValue::List(items)) = properties.get("items") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let PropertyValue::Map(m) = item else { return None };
            let field = m.get("field")?.as_str()?.to_string();
            let operator = m.get("operator")?.as_str()?.to_string();
            let value = m.get("value")?.clone();
            let source = m.get("source")?.as_str()?.to_string();
            Some(Constraint::new(field, operator, value, source))
        })
        .collect()
}

/// Builds and propagates [`PlatformContext`]s across tiers, and enforces
/// the tier-boundary invariant that a declaration only ever validates
/// against the tier it was authored for.
pub struct ContextResolver {
    store: Arc<dyn StateStore>,
}

impl ContextResolver {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Builds a [`PlatformContext`] for `(org, env, app, tier)` by reading
    /// every ancestor tier's resources and accumulated constraints.
    pub async fn resolve_context(
        &self,
        org: &str,
        env: &str,
        app: Option<&str>,
        tier: Tier,
    ) -> Result<PlatformContext, ContextError> {
        let mut parent_outputs = BTreeMap::new();
        let mut constraints = Vec::new();

        for ancestor in tier.ancestors() {
            let ancestor_path = ContextPath::new(org, env, None).tier_qualified(*ancestor);
            debug!(tier = %ancestor, path = %ancestor_path, "reading ancestor tier outputs");

            for resource in self.store.list_resources(&ancestor_path).await? {
                if resource.name == CONSTRAINTS_RESOURCE {
                    continue;
                }
                parent_outputs.insert(resource.name.clone(), resource);
            }

            match self.store.get_resource(&ancestor_path, CONSTRAINTS_RESOURCE).await {
                Ok(marker) => constraints.extend(decode_constraints(&marker.properties)),
                Err(tcp_store::StoreError::ResourceNotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(PlatformContext {
            org: org.to_string(),
            env: env.to_string(),
            app: app.map(|s| s.to_string()),
            tier,
            parent_outputs,
            constraints,
            credentials: BTreeMap::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        })
    }

    /// Persists `outputs` at the context's own tier-qualified path so that
    /// descendant tiers can see them on their next [`resolve_context`] call.
    pub async fn propagate_outputs(
        &self,
        context: &PlatformContext,
        outputs: &[ResourceOutput],
    ) -> Result<(), ContextError> {
        let path = context.context_path().tier_qualified(context.tier);
        for output in outputs {
            self.store.save_resource(&path, output).await?;
        }
        Ok(())
    }

    /// Encodes `constraints` into the `__constraints__` marker resource at
    /// the context's own path so child tiers pick them up as ancestor
    /// constraints on their next resolve.
    pub async fn register_constraints(
        &self,
        context: &PlatformContext,
        constraints: &[Constraint],
    ) -> Result<(), ContextError> {
        let path = context.context_path().tier_qualified(context.tier);
        let mut marker = ResourceOutput::new(CONSTRAINTS_RESOURCE, CONSTRAINTS_ABSTRACT_TYPE, "tcp.internal", Utc::now());
        marker.properties = encode_constraints(constraints);
        self.store.save_resource(&path, &marker).await?;
        Ok(())
    }

    /// Fails with [`ContextError::TierBoundary`] if any declaration was
    /// authored for a different tier than `context`. Otherwise validates
    /// every declaration's properties against the accumulated constraints
    /// and returns every violation found (non-fatal — callers decide).
    pub fn validate_tier_boundary(
        &self,
        context: &PlatformContext,
        declarations: &[CapabilityDeclaration],
    ) -> Result<Vec<ConstraintViolation>, ContextError> {
        for decl in declarations {
            if decl.tier != context.tier {
                return Err(ContextError::TierBoundary(format!(
                    "declaration '{}' is tier {} but context is tier {}",
                    decl.name, decl.tier, context.tier
                )));
            }
        }

        let mut violations = Vec::new();
        for decl in declarations {
            violations.extend(evaluate_all(&context.constraints, &decl.properties));
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_store::InMemoryStore;

    fn resolver() -> ContextResolver {
        ContextResolver::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn resolve_context_rejects_nothing_for_tier_one() {
        let resolver = resolver();
        let ctx = resolver.resolve_context("acme", "prod", None, Tier::Infrastructure).await.unwrap();
        assert!(ctx.parent_outputs.is_empty());
        assert!(ctx.constraints.is_empty());
    }

    #[tokio::test]
    async fn constraints_propagate_downward_and_accumulate() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ContextResolver::new(store.clone());

        let tier1_ctx = resolver.resolve_context("acme", "prod", None, Tier::Infrastructure).await.unwrap();
        resolver
            .register_constraints(&tier1_ctx, &[Constraint::new("memory", "<=", PropertyValue::from("8Gi"), "tier1")])
            .await
            .unwrap();

        let tier2_ctx = resolver.resolve_context("acme", "prod", None, Tier::SharedPrimitive).await.unwrap();
        assert_eq!(tier2_ctx.constraints.len(), 1);
        resolver
            .register_constraints(&tier2_ctx, &[Constraint::new("replicas", "<=", PropertyValue::Int(5), "tier2")])
            .await
            .unwrap();

        let tier3_ctx = resolver.resolve_context("acme", "prod", Some("web"), Tier::Application).await.unwrap();
        assert_eq!(tier3_ctx.constraints.len(), 2);
    }

    #[tokio::test]
    async fn parent_outputs_are_visible_to_descendant_tiers() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ContextResolver::new(store.clone());

        let tier1_ctx = resolver.resolve_context("acme", "prod", None, Tier::Infrastructure).await.unwrap();
        let output = ResourceOutput::new("vpc-1", "network", "aws.vpc", Utc::now());
        resolver.propagate_outputs(&tier1_ctx, &[output]).await.unwrap();

        let tier2_ctx = resolver.resolve_context("acme", "prod", None, Tier::SharedPrimitive).await.unwrap();
        assert!(tier2_ctx.parent_outputs.contains_key("vpc-1"));
    }

    #[tokio::test]
    async fn validate_tier_boundary_rejects_mismatched_tier() {
        let resolver = resolver();
        let ctx = resolver.resolve_context("acme", "prod", None, Tier::Infrastructure).await.unwrap();
        let decl = CapabilityDeclaration::new("db", "database", Tier::Application);
        let err = resolver.validate_tier_boundary(&ctx, &[decl]).unwrap_err();
        assert!(matches!(err, ContextError::TierBoundary(_)));
    }

    #[tokio::test]
    async fn validate_tier_boundary_collects_all_violations() {
        let resolver = resolver();
        let mut ctx = resolver.resolve_context("acme", "prod", None, Tier::Infrastructure).await.unwrap();
        ctx.constraints = vec![
            Constraint::new("memory", "<=", PropertyValue::from("4Gi"), "t1"),
            Constraint::new("replicas", "<=", PropertyValue::Int(3), "t1"),
        ];
        let decl = CapabilityDeclaration::new("db", "database", Tier::Infrastructure)
            .with_property("memory", PropertyValue::from("8Gi"))
            .with_property("replicas", PropertyValue::Int(10));
        let violations = resolver.validate_tier_boundary(&ctx, &[decl]).unwrap();
        assert_eq!(violations.len(), 2);
    }
}
