pub mod context;
pub mod error;

pub use context::{ContextResolver, PlatformContext};
pub use error::ContextError;
