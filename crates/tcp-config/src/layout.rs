use std::collections::BTreeMap;

use chrono::Duration;
use tcp_domain::{CapabilityDeclaration, Constraint, PropertyValue};

/// Per-tier apply gating (spec §6 `execution.tierN_mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    PlanAndApprove,
    AutoApply,
}

impl ExecutionMode {
    pub fn parse(s: &str) -> Option<ExecutionMode> {
        match s {
            "plan_and_approve" => Some(ExecutionMode::PlanAndApprove),
            "auto_apply" => Some(ExecutionMode::AutoApply),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub tier1_mode: ExecutionMode,
    pub tier2_mode: ExecutionMode,
    pub tier3_mode: ExecutionMode,
    pub reconciliation_interval: Duration,
    pub lock_timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            tier1_mode: ExecutionMode::PlanAndApprove,
            tier2_mode: ExecutionMode::PlanAndApprove,
            tier3_mode: ExecutionMode::AutoApply,
            reconciliation_interval: Duration::minutes(5),
            lock_timeout: Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub config: BTreeMap<String, PropertyValue>,
}

/// One tier's declared capabilities and the constraints it imposes on the
/// tiers below it.
#[derive(Debug, Clone, Default)]
pub struct TierSection {
    pub capabilities: Vec<CapabilityDeclaration>,
    pub constraints_for_downstream: Vec<Constraint>,
}

/// Fully validated, converted form of the tier-layout configuration
/// document (spec §6). Every capability carries its tier stamped from the
/// section it was declared in; every constraint's operator is known-valid.
#[derive(Debug, Clone)]
pub struct TierLayout {
    pub org: String,
    pub environment: String,
    pub provider: ProviderConfig,
    pub infrastructure: TierSection,
    pub shared_primitives: TierSection,
    pub application: TierSection,
    pub execution: ExecutionConfig,
}

impl TierLayout {
    /// All capability declarations across every tier, in tier order.
    pub fn all_capabilities(&self) -> Vec<CapabilityDeclaration> {
        let mut out = Vec::new();
        out.extend(self.infrastructure.capabilities.iter().cloned());
        out.extend(self.shared_primitives.capabilities.iter().cloned());
        out.extend(self.application.capabilities.iter().cloned());
        out
    }
}
