use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Hard,
    Soft,
}

/// A directed edge between two resources, possibly across context paths.
/// Stored flat and indexed both forward (by source) and backward (by
/// target) by the state store — never held as an in-memory graph that
/// mixes ownership with traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub source_context: String,
    pub source_resource: String,
    pub target_context: String,
    pub target_resource: String,
    pub kind: DependencyKind,
}

impl DependencyRef {
    pub fn hard(
        source_context: impl Into<String>,
        source_resource: impl Into<String>,
        target_context: impl Into<String>,
        target_resource: impl Into<String>,
    ) -> Self {
        DependencyRef {
            source_context: source_context.into(),
            source_resource: source_resource.into(),
            target_context: target_context.into(),
            target_resource: target_resource.into(),
            kind: DependencyKind::Hard,
        }
    }
}
