mod error;
mod validate;

pub use error::GraphError;
pub use validate::{validate_declarations, validate_plan_order, NodeId, ResolvedGraph};
