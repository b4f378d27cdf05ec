use serde::{Deserialize, Serialize};

/// Ownership level. Context and constraints flow strictly from lower tiers
/// to higher ones; a tier never reads or writes resources above itself and
/// never writes resources below itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Infrastructure = 1,
    SharedPrimitive = 2,
    Application = 3,
}

impl Tier {
    pub fn as_u8(&self) -> u8 {
        match self {
            Tier::Infrastructure => 1,
            Tier::SharedPrimitive => 2,
            Tier::Application => 3,
        }
    }

    /// Tiers strictly below this one, ascending.
    pub fn ancestors(&self) -> &'static [Tier] {
        match self {
            Tier::Infrastructure => &[],
            Tier::SharedPrimitive => &[Tier::Infrastructure],
            Tier::Application => &[Tier::Infrastructure, Tier::SharedPrimitive],
        }
    }

    /// The path segment used in tier-qualified context paths.
    pub fn segment(&self) -> &'static str {
        match self {
            Tier::Infrastructure => "infrastructure",
            Tier::SharedPrimitive => "shared-primitive",
            Tier::Application => "application",
        }
    }

    pub fn from_segment(s: &str) -> Option<Tier> {
        match s {
            "infrastructure" | "tier1" => Some(Tier::Infrastructure),
            "shared-primitive" | "shared_primitives" | "tier2" => Some(Tier::SharedPrimitive),
            "application" | "tier3" => Some(Tier::Application),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_flows_upward() {
        assert!(Tier::Infrastructure < Tier::SharedPrimitive);
        assert!(Tier::SharedPrimitive < Tier::Application);
    }

    #[test]
    fn ancestors_ascending() {
        assert_eq!(
            Tier::Application.ancestors(),
            &[Tier::Infrastructure, Tier::SharedPrimitive]
        );
        assert!(Tier::Infrastructure.ancestors().is_empty());
    }

    #[test]
    fn segment_round_trips() {
        for t in [Tier::Infrastructure, Tier::SharedPrimitive, Tier::Application] {
            assert_eq!(Tier::from_segment(t.segment()), Some(t));
        }
    }
}
