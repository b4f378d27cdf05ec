mod raw;
mod loader;
pub mod layout;
pub mod error;

pub use error::ConfigError;
pub use layout::{ExecutionConfig, ExecutionMode, ProviderConfig, TierLayout, TierSection};
pub use loader::{load_tier_layout, parse_tier_layout};
