use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw YAML representation of the top-level tier-layout configuration
/// document (spec §6).
#[derive(Debug, Deserialize, Serialize)]
pub struct RawTierLayout {
    pub org: Option<String>,
    pub environment: Option<String>,
    pub provider: Option<RawProvider>,
    #[serde(default)]
    pub tiers: RawTiers,
    #[serde(default)]
    pub execution: RawExecution,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawProvider {
    pub name: Option<String>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawTiers {
    #[serde(default)]
    pub infrastructure: RawTierSection,
    #[serde(default)]
    pub shared_primitives: RawTierSection,
    #[serde(default)]
    pub application: RawTierSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawTierSection {
    #[serde(default)]
    pub capabilities: Vec<RawCapability>,
    #[serde(default)]
    pub constraints_for_downstream: Vec<RawConstraint>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawCapability {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub capability_type: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawConstraint {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawExecution {
    pub tier1_mode: Option<String>,
    pub tier2_mode: Option<String>,
    pub tier3_mode: Option<String>,
    pub reconciliation_interval: Option<String>,
    pub lock_timeout: Option<String>,
}

impl Default for RawExecution {
    fn default() -> Self {
        RawExecution {
            tier1_mode: None,
            tier2_mode: None,
            tier3_mode: None,
            reconciliation_interval: None,
            lock_timeout: None,
        }
    }
}
