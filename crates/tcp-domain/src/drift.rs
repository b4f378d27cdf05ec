use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::DiffEntry;
use crate::value::PropertyValue;

/// Shape of divergence found by the reconciler for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Stored resource exists but the driver reports it gone.
    Removed,
    /// Stored resource exists and live state diverges on one or more fields.
    Changed,
}

/// One entry in the append-only drift log, keyed by `(contextPath, detectedAt)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEntry {
    pub context_path: String,
    pub resource_name: String,
    pub kind: DriftKind,
    pub expected: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub actual: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub diff: Vec<DiffEntry>,
    pub detected_at: DateTime<Utc>,
}

impl DriftEntry {
    pub fn removed(
        context_path: impl Into<String>,
        resource_name: impl Into<String>,
        expected: BTreeMap<String, PropertyValue>,
        now: DateTime<Utc>,
    ) -> Self {
        DriftEntry {
            context_path: context_path.into(),
            resource_name: resource_name.into(),
            kind: DriftKind::Removed,
            expected,
            actual: BTreeMap::new(),
            diff: Vec::new(),
            detected_at: now,
        }
    }

    pub fn changed(
        context_path: impl Into<String>,
        resource_name: impl Into<String>,
        expected: BTreeMap<String, PropertyValue>,
        actual: BTreeMap<String, PropertyValue>,
        diff: Vec<DiffEntry>,
        now: DateTime<Utc>,
    ) -> Self {
        DriftEntry {
            context_path: context_path.into(),
            resource_name: resource_name.into(),
            kind: DriftKind::Changed,
            expected,
            actual,
            diff,
            detected_at: now,
        }
    }
}
