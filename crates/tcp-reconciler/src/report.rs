use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tcp_domain::{DependencyRef, DriftEntry};

/// Blast-radius record: a resource that drifted, and every dependency edge
/// whose source is that resource — i.e. everything that would be affected
/// if the drift were left unaddressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossTierImpact {
    pub context_path: String,
    pub resource_name: String,
    pub affected: Vec<DependencyRef>,
}

/// Outcome of one reconciliation cycle over a single context path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub context_path: String,
    pub checked_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub resources_checked: usize,
    pub resources_skipped: usize,
    pub drift: Vec<DriftEntry>,
    pub impacts: Vec<CrossTierImpact>,
}

impl ReconcileResult {
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty()
    }
}
