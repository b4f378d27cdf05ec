use serde::{Deserialize, Serialize};

/// Declared in ascending quality so that `Ord::min` across a set of reports
/// yields the worst fidelity seen (`WorseOf`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FidelityLevel {
    None,
    Stub,
    Partial,
    Full,
}

impl std::fmt::Display for FidelityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FidelityLevel::None => "none",
            FidelityLevel::Stub => "stub",
            FidelityLevel::Partial => "partial",
            FidelityLevel::Full => "full",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityGap {
    pub field: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityReport {
    pub capability: String,
    pub provider: String,
    pub level: FidelityLevel,
    #[serde(default)]
    pub gaps: Vec<FidelityGap>,
}

/// Combines two fidelity levels into the worse of the two.
pub fn worse_of(a: FidelityLevel, b: FidelityLevel) -> FidelityLevel {
    a.min(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worse_of_picks_lower_quality() {
        assert_eq!(worse_of(FidelityLevel::Full, FidelityLevel::Stub), FidelityLevel::Stub);
        assert_eq!(worse_of(FidelityLevel::Partial, FidelityLevel::Full), FidelityLevel::Partial);
    }

    #[test]
    fn ordering_matches_quality() {
        assert!(FidelityLevel::None < FidelityLevel::Stub);
        assert!(FidelityLevel::Stub < FidelityLevel::Partial);
        assert!(FidelityLevel::Partial < FidelityLevel::Full);
    }
}
