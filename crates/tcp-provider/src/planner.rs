use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use tcp_context::PlatformContext;
use tcp_domain::{
    ActionKind, CapabilityDeclaration, DependencyRef, DomainError, FidelityReport, Plan,
    PlanAction, PlanStatus,
};
use tcp_graph::{validate_declarations, validate_plan_order};
use tcp_store::{StateStore, StoreError};
use tracing::debug;

use crate::driver::diff_properties;
use crate::provider::{Provider, ResourcePlan};

fn domain_from_store(err: StoreError) -> DomainError {
    match err {
        StoreError::ResourceNotFound { context_path, name } => {
            DomainError::ResourceNotFound { context_path, name }
        }
        StoreError::LockConflict { context_path, holder } => {
            DomainError::PlanConflict { context_path, reason: format!("locked by '{}'", holder) }
        }
        other => DomainError::Internal(other.to_string()),
    }
}

/// Assembles an ordered [`Plan`] for one tier's capability declarations
/// against one provider.
///
/// Every declaration is mapped through [`Provider::map_capability`] into its
/// provider-specific [`ResourcePlan`]s; each resulting resource is compared
/// against whatever is already persisted at `context`'s context path to
/// decide create vs. update vs. no-op. Actions are ordered so a resource is
/// never placed ahead of something it depends on (spec's plan-ordering
/// invariant, checked again at the end via [`validate_plan_order`]).
///
/// Callers are expected to have already resolved `context` and validated the
/// tier-boundary invariant (`ContextResolver::validate_tier_boundary`) —
/// this function only defends against a declaration whose tier disagrees
/// with the context it was handed, which would indicate a caller bug rather
/// than a data problem.
pub async fn build_plan(
    context: &PlatformContext,
    declarations: &[CapabilityDeclaration],
    provider: &dyn Provider,
    dry_run: bool,
) -> Result<Plan, DomainError> {
    for decl in declarations {
        if decl.tier != context.tier {
            return Err(DomainError::TierBoundary(format!(
                "declaration '{}' is tier {} but context is tier {}",
                decl.name, decl.tier, context.tier
            )));
        }
    }

    let context_path = context.context_path().tier_qualified(context.tier);
    let store = provider.state_store();

    let resolved = validate_declarations(declarations)
        .map_err(|e| DomainError::Internal(format!("capability graph invalid: {}", e)))?;

    let mut fidelity_reports = Vec::with_capacity(declarations.len());
    let mut resource_plans_by_decl: Vec<(String, Vec<ResourcePlan>)> =
        Vec::with_capacity(declarations.len());

    for decl in declarations {
        let resource_plans = provider.map_capability(decl, context).await?;
        let (level, gaps) = provider.fidelity(&decl.capability_type);
        fidelity_reports.push(FidelityReport {
            capability: decl.name.clone(),
            provider: provider.name().to_string(),
            level,
            gaps,
        });
        resource_plans_by_decl.push((decl.name.clone(), resource_plans));
    }

    let by_decl_name: BTreeMap<&str, &Vec<ResourcePlan>> = resource_plans_by_decl
        .iter()
        .map(|(name, plans)| (name.as_str(), plans))
        .collect();

    let mut actions = Vec::new();
    let mut placed = HashSet::new();

    for node in &resolved.topo_order {
        let Some(resource_plans) = by_decl_name.get(node.0.as_str()) else { continue };
        for rp in resource_plans.iter() {
            let action = build_action(&context_path, rp, store.as_ref()).await?;
            placed.insert(rp.resource_name.clone());
            actions.push(action);
        }
    }

    // Defensive: a mapper producing a resource plan whose name never showed up
    // in the capability topo order (e.g. a synthetic sidecar resource) still
    // gets an action, appended after everything already ordered.
    for (_, resource_plans) in &resource_plans_by_decl {
        for rp in resource_plans {
            if !placed.contains(&rp.resource_name) {
                let action = build_action(&context_path, rp, store.as_ref()).await?;
                actions.push(action);
            }
        }
    }

    let mut plan = Plan::new(context.tier, context_path, provider.name(), dry_run, Utc::now());
    plan.actions = actions;
    plan.fidelity_reports = fidelity_reports;

    validate_plan_order(&plan)
        .map_err(|e| DomainError::Internal(format!("assembled plan violates ordering: {}", e)))?;

    debug!(
        context_path = %plan.context_path,
        actions = plan.actions.len(),
        worst_fidelity = ?plan.worst_fidelity(),
        "plan assembled"
    );

    Ok(plan)
}

async fn build_action(
    context_path: &str,
    rp: &ResourcePlan,
    store: &dyn StateStore,
) -> Result<PlanAction, DomainError> {
    match store.get_resource(context_path, &rp.resource_name).await {
        Ok(existing) => {
            let diff = diff_properties(&existing.properties, &rp.properties);
            let action = if diff.is_empty() { ActionKind::NoOp } else { ActionKind::Update };
            Ok(PlanAction {
                action,
                resource_name: rp.resource_name.clone(),
                resource_type: rp.resource_type.clone(),
                provider: rp.provider.clone(),
                before: Some(existing.properties),
                after: Some(rp.properties.clone()),
                diff,
                depends_on: rp.depends_on.clone(),
            })
        }
        Err(StoreError::ResourceNotFound { .. }) => Ok(PlanAction {
            action: ActionKind::Create,
            resource_name: rp.resource_name.clone(),
            resource_type: rp.resource_type.clone(),
            provider: rp.provider.clone(),
            before: None,
            after: Some(rp.properties.clone()),
            diff: Vec::new(),
            depends_on: rp.depends_on.clone(),
        }),
        Err(e) => Err(domain_from_store(e)),
    }
}

/// Executes every action in `plan` against `provider`'s resource drivers, in
/// order, persisting each resource's resulting output as soon as its action
/// completes so a failure partway through leaves prior actions durable.
///
/// Fails closed: a dry-run plan can never be applied, and a plan that is not
/// [`PlanStatus::Approved`] is rejected outright rather than silently
/// applied. Stops at the first failing action — the plan is left at
/// [`PlanStatus::Failed`] and the error identifies which action failed, so
/// the caller can decide whether to retry or re-plan.
pub async fn apply_plan(plan: &mut Plan, provider: &dyn Provider) -> Result<(), DomainError> {
    if plan.dry_run {
        return Err(DomainError::Internal(format!("plan {} is a dry run and cannot be applied", plan.id)));
    }
    if plan.status != PlanStatus::Approved {
        return Err(DomainError::PlanNotApproved { plan_id: plan.id.to_string() });
    }

    plan.status = PlanStatus::Applying;
    let store = provider.state_store();

    for action in &plan.actions {
        if let Err(e) = apply_action(&plan.context_path, action, provider, store.as_ref()).await {
            plan.status = PlanStatus::Failed;
            store.save_plan(plan).await.map_err(domain_from_store)?;
            return Err(e);
        }
    }

    plan.status = PlanStatus::Applied;
    store.save_plan(plan).await.map_err(domain_from_store)?;
    Ok(())
}

async fn apply_action(
    context_path: &str,
    action: &PlanAction,
    provider: &dyn Provider,
    store: &dyn StateStore,
) -> Result<(), DomainError> {
    match action.action {
        ActionKind::NoOp => {}
        ActionKind::Create => {
            let driver = provider.resource_driver(&action.resource_type)?;
            let props = action.after.clone().unwrap_or_default();
            let output = driver.create(&action.resource_name, &props).await?;
            store.save_resource(context_path, &output).await.map_err(domain_from_store)?;
        }
        ActionKind::Update => {
            let driver = provider.resource_driver(&action.resource_type)?;
            let current = store
                .get_resource(context_path, &action.resource_name)
                .await
                .map_err(domain_from_store)?;
            let props = action.after.clone().unwrap_or_default();
            let output = driver.update(&action.resource_name, &current, &props).await?;
            store.save_resource(context_path, &output).await.map_err(domain_from_store)?;
        }
        ActionKind::Delete => {
            let driver = provider.resource_driver(&action.resource_type)?;
            driver.delete(&action.resource_name).await?;
            store.delete_resource(context_path, &action.resource_name).await.map_err(domain_from_store)?;
        }
    }

    if action.action != ActionKind::Delete {
        for dep in &action.depends_on {
            store
                .add_dependency(&DependencyRef::hard(context_path, dep, context_path, &action.resource_name))
                .await
                .map_err(domain_from_store)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use tcp_domain::{PropertyValue, Tier};

    fn ctx() -> PlatformContext {
        PlatformContext {
            org: "acme".to_string(),
            env: "prod".to_string(),
            app: Some("web".to_string()),
            tier: Tier::Application,
            parent_outputs: Map::new(),
            constraints: Vec::new(),
            credentials: Map::new(),
            labels: Map::new(),
            annotations: Map::new(),
        }
    }

    fn decl(name: &str, capability_type: &str, depends_on: &[&str]) -> CapabilityDeclaration {
        CapabilityDeclaration::new(name, capability_type, Tier::Application)
            .with_depends_on(depends_on.iter().map(|s| s.to_string()))
    }

    #[tokio::test]
    async fn build_plan_creates_new_resources_in_dependency_order() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![
            decl("net", "network", &[]),
            decl("rt", "container_runtime", &["net"]),
        ];
        let plan = build_plan(&ctx(), &decls, &provider, false).await.unwrap();
        assert_eq!(plan.actions.len(), 2);
        assert!(plan.actions.iter().all(|a| a.action == ActionKind::Create));
        let net_pos = plan.actions.iter().position(|a| a.resource_name == "net").unwrap();
        let rt_pos = plan.actions.iter().position(|a| a.resource_name == "rt").unwrap();
        assert!(net_pos < rt_pos);
    }

    #[tokio::test]
    async fn build_plan_attaches_fidelity_reports() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![decl("net", "network", &[])];
        let plan = build_plan(&ctx(), &decls, &provider, false).await.unwrap();
        assert_eq!(plan.fidelity_reports.len(), 1);
        assert_eq!(plan.fidelity_reports[0].level, tcp_domain::FidelityLevel::Stub);
    }

    #[tokio::test]
    async fn build_plan_rejects_tier_mismatch() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![CapabilityDeclaration::new("vpc", "network", Tier::Infrastructure)];
        let err = build_plan(&ctx(), &decls, &provider, false).await.unwrap_err();
        assert!(matches!(err, DomainError::TierBoundary(_)));
    }

    #[tokio::test]
    async fn apply_plan_requires_approval() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![decl("net", "network", &[])];
        let mut plan = build_plan(&ctx(), &decls, &provider, false).await.unwrap();
        let err = apply_plan(&mut plan, &provider).await.unwrap_err();
        assert!(matches!(err, DomainError::PlanNotApproved { .. }));
    }

    #[tokio::test]
    async fn apply_plan_creates_then_persists_resources() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![decl("net", "network", &[])];
        let mut plan = build_plan(&ctx(), &decls, &provider, false).await.unwrap();
        plan.approve("alice", Utc::now());
        apply_plan(&mut plan, &provider).await.unwrap();
        assert_eq!(plan.status, PlanStatus::Applied);

        let stored = provider.state_store().get_resource(&plan.context_path, "net").await.unwrap();
        assert_eq!(stored.name, "net");
    }

    #[tokio::test]
    async fn replanning_after_apply_reports_no_op() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![decl("net", "network", &[]).with_property("cidr", PropertyValue::from("10.0.0.0/16"))];
        let mut plan = build_plan(&ctx(), &decls, &provider, false).await.unwrap();
        plan.approve("alice", Utc::now());
        apply_plan(&mut plan, &provider).await.unwrap();

        let second = build_plan(&ctx(), &decls, &provider, false).await.unwrap();
        assert_eq!(second.actions.len(), 1);
        assert_eq!(second.actions[0].action, ActionKind::NoOp);
    }

    #[tokio::test]
    async fn dry_run_plan_cannot_be_applied() {
        let provider = crate::local::LocalProvider::new();
        let decls = vec![decl("net", "network", &[])];
        let mut plan = build_plan(&ctx(), &decls, &provider, true).await.unwrap();
        plan.approve("alice", Utc::now());
        let err = apply_plan(&mut plan, &provider).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
