use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("capability '{name}' depends on unknown capability '{depends_on}'")]
    DanglingDependency { name: String, depends_on: String },

    #[error("duplicate capability name '{name}' at tier {tier}")]
    DuplicateName { name: String, tier: String },

    #[error("cycle detected in capability dependency graph")]
    CycleDetected,

    #[error("plan action '{action}' appears before its dependency '{depends_on}'")]
    OutOfOrder { action: String, depends_on: String },

    #[error("delete action '{action}' appears before dependent delete '{depends_on}'")]
    DeleteOutOfOrder { action: String, depends_on: String },

    #[error("multiple errors")]
    Multiple(Vec<GraphError>),
}
