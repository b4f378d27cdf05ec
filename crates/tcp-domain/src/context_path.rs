use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// Canonical hierarchical identifier partitioning state: `org/env` for
/// tiers 1/2, `org/env/app` for tier 3. A tier-qualified variant
/// (`org/env/tierN`) is used as the state-store partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextPath(String);

impl ContextPath {
    pub fn new(org: &str, env: &str, app: Option<&str>) -> Self {
        match app {
            Some(app) => ContextPath(format!("{}/{}/{}", org, env, app)),
            None => ContextPath(format!("{}/{}", org, env)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tier-qualified partition key used by the state store, e.g.
    /// `acme/prod/tier1`.
    pub fn tier_qualified(&self, tier: Tier) -> String {
        format!("{}/{}", self.0, tier.segment())
    }
}

impl std::fmt::Display for ContextPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContextPath {
    fn from(s: String) -> Self {
        ContextPath(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_one_and_two_have_no_app_segment() {
        assert_eq!(ContextPath::new("acme", "prod", None).as_str(), "acme/prod");
    }

    #[test]
    fn tier_three_includes_app() {
        assert_eq!(ContextPath::new("acme", "prod", Some("web")).as_str(), "acme/prod/web");
    }

    #[test]
    fn tier_qualified_appends_segment() {
        let cp = ContextPath::new("acme", "prod", None);
        assert_eq!(cp.tier_qualified(Tier::Infrastructure), "acme/prod/infrastructure");
    }
}
