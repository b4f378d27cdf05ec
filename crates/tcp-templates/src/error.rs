use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{name}' version '{version}' already registered")]
    DuplicateTemplate { name: String, version: String },

    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("template '{name}' has no registered versions")]
    NoVersions { name: String },

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{name}' does not match required pattern '{pattern}'")]
    PatternMismatch { name: String, pattern: String },
}
