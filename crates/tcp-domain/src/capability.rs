use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::tier::Tier;
use crate::value::PropertyValue;

/// A provider-agnostic resource requirement, independent of any cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub capability_type: String,
    pub tier: Tier,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

impl CapabilityDeclaration {
    pub fn new(name: impl Into<String>, capability_type: impl Into<String>, tier: Tier) -> Self {
        CapabilityDeclaration {
            name: name.into(),
            capability_type: capability_type.into(),
            tier,
            properties: BTreeMap::new(),
            constraints: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_depends_on(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.depends_on = names.into_iter().collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trips_through_json() {
        let decl = CapabilityDeclaration::new("db", "database", Tier::SharedPrimitive)
            .with_property("memory", PropertyValue::from("4Gi"))
            .with_depends_on(["vpc".to_string()]);
        let json = serde_json::to_string(&decl).unwrap();
        let back: CapabilityDeclaration = serde_json::from_str(&json).unwrap();
        assert_eq!(decl, back);
    }
}
