pub mod capability;
pub mod constraint;
pub mod context_path;
pub mod dependency;
pub mod drift;
pub mod error;
pub mod fidelity;
pub mod lock;
pub mod plan;
pub mod resource;
pub mod tier;
pub mod value;

pub use capability::CapabilityDeclaration;
pub use constraint::{Constraint, ConstraintViolation, Operator};
pub use context_path::ContextPath;
pub use dependency::{DependencyKind, DependencyRef};
pub use drift::{DriftEntry, DriftKind};
pub use error::DomainError;
pub use fidelity::{FidelityGap, FidelityLevel, FidelityReport};
pub use lock::Lock;
pub use plan::{ActionKind, DiffEntry, Plan, PlanAction, PlanStatus};
pub use resource::{ResourceOutput, ResourceStatus};
pub use tier::Tier;
pub use value::PropertyValue;
