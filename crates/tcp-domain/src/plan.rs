use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fidelity::FidelityReport;
use crate::tier::Tier;
use crate::value::PropertyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub field: String,
    pub before: Option<PropertyValue>,
    pub after: Option<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    pub action: ActionKind,
    pub resource_name: String,
    pub resource_type: String,
    pub provider: String,
    pub before: Option<BTreeMap<String, PropertyValue>>,
    pub after: Option<BTreeMap<String, PropertyValue>>,
    #[serde(default)]
    pub diff: Vec<DiffEntry>,
    /// Names of other actions in the same plan this one depends on.
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Approved,
    Applying,
    Applied,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub tier: Tier,
    pub context_path: String,
    pub actions: Vec<PlanAction>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub status: PlanStatus,
    pub provider: String,
    pub dry_run: bool,
    #[serde(default)]
    pub fidelity_reports: Vec<FidelityReport>,
}

impl Plan {
    pub fn new(tier: Tier, context_path: impl Into<String>, provider: impl Into<String>, dry_run: bool, now: DateTime<Utc>) -> Self {
        Plan {
            id: Uuid::new_v4(),
            tier,
            context_path: context_path.into(),
            actions: Vec::new(),
            created_at: now,
            approved_at: None,
            approved_by: None,
            status: PlanStatus::Pending,
            provider: provider.into(),
            dry_run,
            fidelity_reports: Vec::new(),
        }
    }

    pub fn approve(&mut self, by: impl Into<String>, now: DateTime<Utc>) {
        self.status = PlanStatus::Approved;
        self.approved_at = Some(now);
        self.approved_by = Some(by.into());
    }

    /// Minimum fidelity level across every report attached to this plan.
    pub fn worst_fidelity(&self) -> Option<crate::fidelity::FidelityLevel> {
        self.fidelity_reports
            .iter()
            .map(|r| r.level)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_plan_is_pending() {
        let p = Plan::new(Tier::Application, "acme/prod/web", "local", false, Utc::now());
        assert_eq!(p.status, PlanStatus::Pending);
        assert!(p.approved_at.is_none());
    }

    #[test]
    fn approve_sets_fields() {
        let mut p = Plan::new(Tier::Application, "acme/prod/web", "local", false, Utc::now());
        p.approve("alice", Utc::now());
        assert_eq!(p.status, PlanStatus::Approved);
        assert_eq!(p.approved_by.as_deref(), Some("alice"));
    }
}
