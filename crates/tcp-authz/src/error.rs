use thiserror::Error;
use tcp_domain::Tier;

use crate::policy::Operation;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("role '{0}' is not recognized")]
    UnknownRole(String),

    #[error("role '{role}' may not access tier {tier}")]
    TierDenied { role: String, tier: Tier },

    #[error("role '{role}' may not perform '{operation:?}'")]
    OperationDenied { role: String, operation: Operation },
}
