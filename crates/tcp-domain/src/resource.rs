use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Creating,
    Active,
    Updating,
    Deleting,
    Deleted,
    Failed,
    Degraded,
    Drifted,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceStatus::Pending => "pending",
            ResourceStatus::Creating => "creating",
            ResourceStatus::Active => "active",
            ResourceStatus::Updating => "updating",
            ResourceStatus::Deleting => "deleting",
            ResourceStatus::Deleted => "deleted",
            ResourceStatus::Failed => "failed",
            ResourceStatus::Degraded => "degraded",
            ResourceStatus::Drifted => "drifted",
        };
        write!(f, "{}", s)
    }
}

/// The persisted shape of one provisioned resource. `credential_ref` is a
/// reference only; no credential material is ever stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOutput {
    pub name: String,
    pub abstract_type: String,
    pub provider_type: String,
    pub endpoint: Option<String>,
    pub connection_string: Option<String>,
    pub credential_ref: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    pub status: ResourceStatus,
    pub last_synced: DateTime<Utc>,
}

impl ResourceOutput {
    pub fn new(name: impl Into<String>, abstract_type: impl Into<String>, provider_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        ResourceOutput {
            name: name.into(),
            abstract_type: abstract_type.into(),
            provider_type: provider_type.into(),
            endpoint: None,
            connection_string: None,
            credential_ref: None,
            properties: BTreeMap::new(),
            status: ResourceStatus::Pending,
            last_synced: now,
        }
    }
}
