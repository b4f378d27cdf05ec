use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tcp_domain::{ActionKind, CapabilityDeclaration, Plan};

use crate::error::GraphError;

/// Opaque node identifier in a resolved graph — a capability or plan-action name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// Result of validating a set of capability declarations.
#[derive(Debug)]
pub struct ResolvedGraph {
    /// Capability names in topological order (dependencies first).
    pub topo_order: Vec<NodeId>,
}

/// Validate that `dependsOn` forms a DAG over a set of same-plan capability
/// declarations and that every dependency name resolves to a declaration in
/// the same set. `(tier, name)` uniqueness (the other half of the §3
/// invariant) is checked here too since both are cheap structural checks
/// over the same input.
pub fn validate_declarations(decls: &[CapabilityDeclaration]) -> Result<ResolvedGraph, GraphError> {
    let mut errors: Vec<GraphError> = Vec::new();
    let mut seen: HashMap<(u8, &str), ()> = HashMap::new();
    for d in decls {
        let key = (d.tier.as_u8(), d.name.as_str());
        if seen.insert(key, ()).is_some() {
            errors.push(GraphError::DuplicateName {
                name: d.name.clone(),
                tier: d.tier.to_string(),
            });
        }
    }

    let by_name: HashMap<&str, &CapabilityDeclaration> =
        decls.iter().map(|d| (d.name.as_str(), d)).collect();

    for d in decls {
        for dep in &d.depends_on {
            if !by_name.contains_key(dep.as_str()) {
                errors.push(GraphError::DanglingDependency {
                    name: d.name.clone(),
                    depends_on: dep.clone(),
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(single_or_multiple(errors));
    }

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let node_map: HashMap<&str, NodeIndex> = decls
        .iter()
        .map(|d| (d.name.as_str(), graph.add_node(d.name.as_str())))
        .collect();

    for d in decls {
        let to = node_map[d.name.as_str()];
        for dep in &d.depends_on {
            let from = node_map[dep.as_str()];
            graph.add_edge(from, to, ());
        }
    }

    if is_cyclic_directed(&graph) {
        return Err(GraphError::CycleDetected);
    }

    let topo = petgraph::algo::toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;
    let topo_order = topo.iter().map(|idx| NodeId(graph[*idx].to_string())).collect();

    Ok(ResolvedGraph { topo_order })
}

/// Validates the ordering invariant on an assembled [`Plan`]: every
/// create/update action's resource name appears strictly after all of its
/// `dependsOn` names, and delete actions appear in reverse dependency order
/// (a delete must come before the deletes of anything it depends on).
pub fn validate_plan_order(plan: &Plan) -> Result<(), GraphError> {
    let position: HashMap<&str, usize> = plan
        .actions
        .iter()
        .enumerate()
        .map(|(i, a)| (a.resource_name.as_str(), i))
        .collect();

    let mut errors: Vec<GraphError> = Vec::new();
    for (i, action) in plan.actions.iter().enumerate() {
        for dep in &action.depends_on {
            let Some(&dep_pos) = position.get(dep.as_str()) else {
                continue;
            };
            match action.action {
                ActionKind::Delete => {
                    if dep_pos < i {
                        errors.push(GraphError::DeleteOutOfOrder {
                            action: action.resource_name.clone(),
                            depends_on: dep.clone(),
                        });
                    }
                }
                _ => {
                    if dep_pos > i {
                        errors.push(GraphError::OutOfOrder {
                            action: action.resource_name.clone(),
                            depends_on: dep.clone(),
                        });
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(single_or_multiple(errors))
    }
}

fn single_or_multiple(mut errors: Vec<GraphError>) -> GraphError {
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        GraphError::Multiple(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tcp_domain::{DiffEntry, PlanAction, PlanStatus, Tier};

    fn decl(name: &str, tier: Tier, depends_on: &[&str]) -> CapabilityDeclaration {
        CapabilityDeclaration::new(name, "generic", tier)
            .with_depends_on(depends_on.iter().map(|s| s.to_string()))
    }

    #[test]
    fn valid_dag_topo_sorts() {
        let decls = vec![
            decl("vpc", Tier::Infrastructure, &[]),
            decl("eks", Tier::Infrastructure, &["vpc"]),
            decl("nodegroup", Tier::Infrastructure, &["eks"]),
        ];
        let resolved = validate_declarations(&decls).unwrap();
        let pos = |n: &str| resolved.topo_order.iter().position(|x| x.0 == n).unwrap();
        assert!(pos("vpc") < pos("eks"));
        assert!(pos("eks") < pos("nodegroup"));
    }

    #[test]
    fn dangling_dependency_detected() {
        let decls = vec![decl("eks", Tier::Infrastructure, &["vpc"])];
        let err = validate_declarations(&decls).unwrap_err();
        assert!(matches!(err, GraphError::DanglingDependency { .. }));
    }

    #[test]
    fn duplicate_name_same_tier_detected() {
        let decls = vec![
            decl("vpc", Tier::Infrastructure, &[]),
            decl("vpc", Tier::Infrastructure, &[]),
        ];
        let err = validate_declarations(&decls).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName { .. }));
    }

    #[test]
    fn cycle_detected() {
        let decls = vec![
            decl("a", Tier::Infrastructure, &["b"]),
            decl("b", Tier::Infrastructure, &["a"]),
        ];
        let err = validate_declarations(&decls).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected));
    }

    fn action(kind: ActionKind, name: &str, depends_on: &[&str]) -> PlanAction {
        PlanAction {
            action: kind,
            resource_name: name.to_string(),
            resource_type: "generic".to_string(),
            provider: "local".to_string(),
            before: None,
            after: Some(BTreeMap::new()),
            diff: Vec::<DiffEntry>::new(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn plan_create_order_respects_dependencies() {
        let mut plan = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now());
        plan.status = PlanStatus::Pending;
        plan.actions = vec![
            action(ActionKind::Create, "vpc", &[]),
            action(ActionKind::Create, "eks", &["vpc"]),
            action(ActionKind::Create, "nodegroup", &["eks"]),
        ];
        assert!(validate_plan_order(&plan).is_ok());
    }

    #[test]
    fn plan_create_order_violation_detected() {
        let mut plan = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now());
        plan.actions = vec![
            action(ActionKind::Create, "eks", &["vpc"]),
            action(ActionKind::Create, "vpc", &[]),
        ];
        let err = validate_plan_order(&plan).unwrap_err();
        assert!(matches!(err, GraphError::OutOfOrder { .. }));
    }

    #[test]
    fn plan_delete_order_is_reverse_of_create_order() {
        let mut plan = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now());
        plan.actions = vec![
            action(ActionKind::Delete, "nodegroup", &["eks"]),
            action(ActionKind::Delete, "eks", &["vpc"]),
            action(ActionKind::Delete, "vpc", &[]),
        ];
        assert!(validate_plan_order(&plan).is_ok());
    }
}
