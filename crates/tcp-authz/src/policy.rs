use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tcp_domain::Tier;

use crate::error::AuthzError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Create,
    Update,
    Delete,
    Approve,
}

impl Operation {
    /// Maps an HTTP method to the operation it represents at the tier
    /// boundary. `None` for methods this system never authorizes a write
    /// against (e.g. `TRACE`).
    pub fn from_http_method(method: &str) -> Option<Operation> {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" | "OPTIONS" => Some(Operation::Read),
            "POST" => Some(Operation::Create),
            "PUT" | "PATCH" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RolePolicy {
    pub tiers: HashSet<Tier>,
    pub operations: HashSet<Operation>,
}

impl RolePolicy {
    pub fn new(tiers: impl IntoIterator<Item = Tier>, operations: impl IntoIterator<Item = Operation>) -> Self {
        RolePolicy {
            tiers: tiers.into_iter().collect(),
            operations: operations.into_iter().collect(),
        }
    }
}

fn default_policies() -> HashMap<String, RolePolicy> {
    use Operation::*;
    use Tier::*;

    let mut policies = HashMap::new();
    policies.insert(
        "tier_admin".to_string(),
        RolePolicy::new([Infrastructure, SharedPrimitive, Application], [Read, Write, Create, Update, Delete, Approve]),
    );
    policies.insert(
        "tier_author".to_string(),
        RolePolicy::new([SharedPrimitive, Application], [Read, Write, Create, Update]),
    );
    policies.insert(
        "tier_viewer".to_string(),
        RolePolicy::new([Infrastructure, SharedPrimitive, Application], [Read]),
    );
    policies.insert(
        "tier_approver".to_string(),
        RolePolicy::new([Infrastructure, SharedPrimitive], [Read, Approve]),
    );
    policies
}

/// Role-scoped authorization over (tier, operation) pairs. Seeded with the
/// four default roles; callers may override or add roles at runtime via
/// [`register_policy`](TierAuthorizer::register_policy).
pub struct TierAuthorizer {
    policies: RwLock<HashMap<String, RolePolicy>>,
}

impl Default for TierAuthorizer {
    fn default() -> Self {
        TierAuthorizer { policies: RwLock::new(default_policies()) }
    }
}

impl TierAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_policy(&self, role: impl Into<String>, policy: RolePolicy) {
        self.policies.write().expect("authz policy lock poisoned").insert(role.into(), policy);
    }

    /// Fails with [`AuthzError::UnknownRole`] for an unrecognized role,
    /// [`AuthzError::TierDenied`] if the role has no access to `tier`, or
    /// [`AuthzError::OperationDenied`] if the role cannot perform `operation`.
    pub fn authorize(&self, role: &str, tier: Tier, operation: Operation) -> Result<(), AuthzError> {
        let guard = self.policies.read().expect("authz policy lock poisoned");
        let policy = guard.get(role).ok_or_else(|| AuthzError::UnknownRole(role.to_string()))?;

        if !policy.tiers.contains(&tier) {
            return Err(AuthzError::TierDenied { role: role.to_string(), tier });
        }
        if !policy.operations.contains(&operation) {
            return Err(AuthzError::OperationDenied { role: role.to_string(), operation });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_admin_can_do_everything() {
        let authz = TierAuthorizer::new();
        for tier in [Tier::Infrastructure, Tier::SharedPrimitive, Tier::Application] {
            for op in [Operation::Read, Operation::Write, Operation::Create, Operation::Update, Operation::Delete, Operation::Approve] {
                assert!(authz.authorize("tier_admin", tier, op).is_ok());
            }
        }
    }

    #[test]
    fn tier_author_cannot_touch_infrastructure() {
        let authz = TierAuthorizer::new();
        let err = authz.authorize("tier_author", Tier::Infrastructure, Operation::Read).unwrap_err();
        assert!(matches!(err, AuthzError::TierDenied { .. }));
    }

    #[test]
    fn tier_viewer_cannot_write() {
        let authz = TierAuthorizer::new();
        let err = authz.authorize("tier_viewer", Tier::Application, Operation::Write).unwrap_err();
        assert!(matches!(err, AuthzError::OperationDenied { .. }));
    }

    #[test]
    fn tier_approver_can_approve_lower_tiers_only() {
        let authz = TierAuthorizer::new();
        assert!(authz.authorize("tier_approver", Tier::SharedPrimitive, Operation::Approve).is_ok());
        assert!(authz.authorize("tier_approver", Tier::Application, Operation::Approve).is_err());
    }

    #[test]
    fn unknown_role_is_denied_with_reason() {
        let authz = TierAuthorizer::new();
        let err = authz.authorize("nobody", Tier::Infrastructure, Operation::Read).unwrap_err();
        assert!(matches!(err, AuthzError::UnknownRole(_)));
    }

    #[test]
    fn runtime_policy_override() {
        let authz = TierAuthorizer::new();
        authz.register_policy("auditor", RolePolicy::new([Tier::Infrastructure], [Operation::Read]));
        assert!(authz.authorize("auditor", Tier::Infrastructure, Operation::Read).is_ok());
        assert!(authz.authorize("auditor", Tier::Application, Operation::Read).is_err());
    }

    #[test]
    fn http_method_mapping() {
        assert_eq!(Operation::from_http_method("GET"), Some(Operation::Read));
        assert_eq!(Operation::from_http_method("POST"), Some(Operation::Create));
        assert_eq!(Operation::from_http_method("PUT"), Some(Operation::Update));
        assert_eq!(Operation::from_http_method("PATCH"), Some(Operation::Update));
        assert_eq!(Operation::from_http_method("DELETE"), Some(Operation::Delete));
        assert_eq!(Operation::from_http_method("TRACE"), None);
    }
}
