pub mod error;
pub mod template;

pub use error::TemplateError;
pub use template::{TemplateParameter, TemplateRegistry, WorkflowTemplate};
