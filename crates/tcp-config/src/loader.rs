use std::path::Path;

use tcp_domain::{CapabilityDeclaration, Constraint, PropertyValue, Tier, constraint::Operator};
use tracing::debug;

use crate::error::ConfigError;
use crate::layout::{ExecutionConfig, ExecutionMode, ProviderConfig, TierLayout, TierSection};
use crate::raw::{RawCapability, RawConstraint, RawExecution, RawTierLayout, RawTierSection};

/// Loads and validates the tier-layout YAML document at `path` (spec §6).
pub fn load_tier_layout(path: &Path) -> Result<TierLayout, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_tier_layout(&content)
}

/// Parses and validates a tier-layout document already read into memory.
pub fn parse_tier_layout(content: &str) -> Result<TierLayout, ConfigError> {
    let raw: RawTierLayout = serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
        path: "<in-memory>".to_string(),
        source: e,
    })?;
    convert(raw)
}

fn convert(raw: RawTierLayout) -> Result<TierLayout, ConfigError> {
    let mut problems = Vec::new();

    let org = raw.org.clone().filter(|s| !s.is_empty());
    if org.is_none() {
        problems.push("missing required field 'org'".to_string());
    }

    let environment = raw.environment.clone().filter(|s| !s.is_empty());
    if environment.is_none() {
        problems.push("missing required field 'environment'".to_string());
    }

    let provider_name = raw
        .provider
        .as_ref()
        .and_then(|p| p.name.clone())
        .filter(|s| !s.is_empty());
    if provider_name.is_none() {
        problems.push("missing required field 'provider.name'".to_string());
    }

    let infrastructure = convert_section(&raw.tiers.infrastructure, Tier::Infrastructure, &mut problems);
    let shared_primitives = convert_section(&raw.tiers.shared_primitives, Tier::SharedPrimitive, &mut problems);
    let application = convert_section(&raw.tiers.application, Tier::Application, &mut problems);

    let execution = convert_execution(&raw.execution, &mut problems);

    if !problems.is_empty() {
        debug!(count = problems.len(), "tier-layout configuration rejected");
        return Err(ConfigError::Conversion { message: problems.join("; ") });
    }

    let provider_config = raw
        .provider
        .map(|p| {
            p.config
                .into_iter()
                .filter_map(|(k, v)| json_to_property(&v).ok().map(|pv| (k, pv)))
                .collect()
        })
        .unwrap_or_default();

    Ok(TierLayout {
        org: org.unwrap(),
        environment: environment.unwrap(),
        provider: ProviderConfig { name: provider_name.unwrap(), config: provider_config },
        infrastructure,
        shared_primitives,
        application,
        execution,
    })
}

fn json_to_property(value: &serde_json::Value) -> Result<PropertyValue, ()> {
    serde_json::from_value(value.clone()).map_err(|_| ())
}

fn convert_section(raw: &RawTierSection, tier: Tier, problems: &mut Vec<String>) -> TierSection {
    let mut capabilities = Vec::new();
    for cap in &raw.capabilities {
        match convert_capability(cap, tier) {
            Ok(decl) => capabilities.push(decl),
            Err(msg) => problems.push(msg),
        }
    }

    let mut constraints = Vec::new();
    for c in &raw.constraints_for_downstream {
        match convert_constraint(c, tier) {
            Ok(constraint) => constraints.push(constraint),
            Err(msg) => problems.push(msg),
        }
    }

    TierSection { capabilities, constraints_for_downstream: constraints }
}

fn convert_capability(raw: &RawCapability, tier: Tier) -> Result<CapabilityDeclaration, String> {
    let name = raw
        .name
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("capability in tier '{}' is missing 'name'", tier))?;
    let capability_type = raw
        .capability_type
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("capability '{}' in tier '{}' is missing 'type'", name, tier))?;

    let mut decl = CapabilityDeclaration::new(name, capability_type, tier);
    decl.depends_on = raw.depends_on.clone();
    for (k, v) in &raw.properties {
        if let Ok(pv) = json_to_property(v) {
            decl.properties.insert(k.clone(), pv);
        }
    }
    Ok(decl)
}

fn convert_constraint(raw: &RawConstraint, tier: Tier) -> Result<Constraint, String> {
    let field = raw
        .field
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("constraint in tier '{}' is missing 'field'", tier))?;
    let operator = raw
        .operator
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("constraint on field '{}' in tier '{}' is missing 'operator'", field, tier))?;
    if Operator::parse(&operator).is_none() {
        return Err(format!("constraint on field '{}' in tier '{}' has unrecognized operator '{}'", field, tier, operator));
    }
    let value = raw
        .value
        .as_ref()
        .and_then(|v| json_to_property(v).ok())
        .ok_or_else(|| format!("constraint on field '{}' in tier '{}' is missing 'value'", field, tier))?;

    Ok(Constraint::new(field, operator, value, tier.to_string()))
}

fn convert_execution(raw: &RawExecution, problems: &mut Vec<String>) -> ExecutionConfig {
    let default = ExecutionConfig::default();

    let mode_or_default = |field: &str, value: &Option<String>, fallback: ExecutionMode, problems: &mut Vec<String>| match value {
        None => fallback,
        Some(s) => ExecutionMode::parse(s).unwrap_or_else(|| {
            problems.push(format!("execution.{} has unrecognized value '{}'", field, s));
            fallback
        }),
    };

    let tier1_mode = mode_or_default("tier1_mode", &raw.tier1_mode, default.tier1_mode, problems);
    let tier2_mode = mode_or_default("tier2_mode", &raw.tier2_mode, default.tier2_mode, problems);
    let tier3_mode = mode_or_default("tier3_mode", &raw.tier3_mode, default.tier3_mode, problems);

    let reconciliation_interval = raw
        .reconciliation_interval
        .as_deref()
        .map(|s| parse_duration(s, problems, "execution.reconciliation_interval"))
        .unwrap_or(default.reconciliation_interval);

    let lock_timeout = raw
        .lock_timeout
        .as_deref()
        .map(|s| parse_duration(s, problems, "execution.lock_timeout"))
        .unwrap_or(default.lock_timeout);

    ExecutionConfig { tier1_mode, tier2_mode, tier3_mode, reconciliation_interval, lock_timeout }
}

/// Parses a Go-style duration string (`"5m"`, `"30s"`, `"1h"`, `"10m30s"`)
/// into a [`chrono::Duration`]. Falls back to zero and records a problem on
/// malformed input rather than panicking.
fn parse_duration(s: &str, problems: &mut Vec<String>, field: &str) -> chrono::Duration {
    let mut total = chrono::Duration::zero();
    let mut digits = String::new();
    let mut matched_any = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            digits.push(ch);
            continue;
        }
        let Ok(n) = digits.parse::<f64>() else {
            problems.push(format!("{} has malformed duration '{}'", field, s));
            return chrono::Duration::zero();
        };
        digits.clear();
        let unit = match ch {
            's' => chrono::Duration::milliseconds((n * 1000.0) as i64),
            'm' => chrono::Duration::milliseconds((n * 60_000.0) as i64),
            'h' => chrono::Duration::milliseconds((n * 3_600_000.0) as i64),
            _ => {
                problems.push(format!("{} has unknown duration unit in '{}'", field, s));
                return chrono::Duration::zero();
            }
        };
        total = total + unit;
        matched_any = true;
    }

    if !matched_any {
        problems.push(format!("{} has malformed duration '{}'", field, s));
        return chrono::Duration::zero();
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_DOC: &str = r#"
org: acme
environment: prod
provider:
  name: local
  config: {}
tiers:
  infrastructure:
    capabilities:
      - name: vpc
        type: network
        properties:
          cidr: "10.0.0.0/16"
    constraints_for_downstream:
      - field: memory
        operator: "<="
        value: "4Gi"
  shared_primitives:
    capabilities:
      - name: cluster
        type: container_runtime
        dependsOn: [vpc]
  application:
    capabilities:
      - name: api
        type: container_runtime
execution:
  tier1_mode: plan_and_approve
  tier3_mode: auto_apply
  reconciliation_interval: 5m
  lock_timeout: 10m
"#;

    #[test]
    fn valid_document_parses() {
        let layout = parse_tier_layout(VALID_DOC).unwrap();
        assert_eq!(layout.org, "acme");
        assert_eq!(layout.infrastructure.capabilities.len(), 1);
        assert_eq!(layout.infrastructure.capabilities[0].tier, Tier::Infrastructure);
        assert_eq!(layout.infrastructure.constraints_for_downstream.len(), 1);
        assert_eq!(layout.execution.reconciliation_interval, chrono::Duration::minutes(5));
    }

    #[test]
    fn missing_org_is_rejected() {
        let doc = r#"
environment: prod
provider:
  name: local
"#;
        let err = parse_tier_layout(doc).unwrap_err();
        match err {
            ConfigError::Conversion { message } => assert!(message.contains("org")),
            other => panic!("expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn missing_provider_name_is_rejected() {
        let doc = r#"
org: acme
environment: prod
"#;
        let err = parse_tier_layout(doc).unwrap_err();
        match err {
            ConfigError::Conversion { message } => assert!(message.contains("provider.name")),
            other => panic!("expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn capability_without_type_is_rejected() {
        let doc = r#"
org: acme
environment: prod
provider:
  name: local
tiers:
  infrastructure:
    capabilities:
      - name: vpc
"#;
        let err = parse_tier_layout(doc).unwrap_err();
        match err {
            ConfigError::Conversion { message } => assert!(message.contains("missing 'type'")),
            other => panic!("expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_constraint_operator_is_rejected() {
        let doc = r#"
org: acme
environment: prod
provider:
  name: local
tiers:
  infrastructure:
    constraints_for_downstream:
      - field: memory
        operator: "~="
        value: "4Gi"
"#;
        let err = parse_tier_layout(doc).unwrap_err();
        match err {
            ConfigError::Conversion { message } => assert!(message.contains("unrecognized operator")),
            other => panic!("expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn default_tier3_mode_is_auto_apply() {
        let layout = parse_tier_layout(VALID_DOC).unwrap();
        assert_eq!(layout.execution.tier2_mode, ExecutionMode::PlanAndApprove);
        assert_eq!(layout.execution.tier3_mode, ExecutionMode::AutoApply);
    }

    #[test]
    fn parses_combined_duration_units() {
        let mut problems = Vec::new();
        let d = parse_duration("1h30m", &mut problems, "test");
        assert!(problems.is_empty());
        assert_eq!(d, chrono::Duration::minutes(90));
    }
}
