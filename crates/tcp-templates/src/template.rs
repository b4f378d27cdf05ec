use std::collections::BTreeMap;
use std::sync::RwLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tcp_domain::{CapabilityDeclaration, PropertyValue};

use crate::error::TemplateError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<PropertyValue>,
    /// Validated against the supplied value when the parameter is a string.
    #[serde(default)]
    pub validation_regex: Option<String>,
}

impl TemplateParameter {
    pub fn required(name: impl Into<String>) -> Self {
        TemplateParameter { name: name.into(), required: true, default: None, validation_regex: None }
    }

    pub fn optional(name: impl Into<String>, default: PropertyValue) -> Self {
        TemplateParameter { name: name.into(), required: false, default: Some(default), validation_regex: None }
    }

    pub fn with_regex(mut self, pattern: impl Into<String>) -> Self {
        self.validation_regex = Some(pattern.into());
        self
    }
}

/// A versioned, parameterized set of capability declarations. Declarations
/// embed `${param}` placeholders in their `name`/`type`/`dependsOn`/property
/// string fields; [`resolve`](TemplateRegistry::resolve) substitutes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub parameters: Vec<TemplateParameter>,
    pub declarations: Vec<CapabilityDeclaration>,
}

/// Splits a dotted version string into numeric components for ordering
/// (`"1.2.0" < "1.10.0"`, unlike plain string comparison). Non-numeric
/// components sort as zero.
fn version_key(version: &str) -> Vec<u64> {
    version.split('.').map(|part| part.parse::<u64>().unwrap_or(0)).collect()
}

fn placeholder_regex() -> Regex {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("valid placeholder regex")
}

/// Substitutes every `${param}` in `s`, stringifying native parameter
/// values. Used for fields that must remain plain strings (name, type,
/// dependsOn entries).
fn render_string(s: &str, params: &BTreeMap<String, PropertyValue>, re: &Regex) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in re.captures_iter(s) {
        let m = caps.get(0).unwrap();
        out.push_str(&s[last..m.start()]);
        let key = &caps[1];
        match params.get(key) {
            Some(value) => out.push_str(&value.stringify()),
            None => out.push_str(m.as_str()),
        }
        last = m.end();
    }
    out.push_str(&s[last..]);
    out
}

/// Substitutes placeholders in a property value, recursing into maps and
/// lists. A string that is *exactly* one placeholder is replaced by the
/// parameter's native value, preserving its type; any other string
/// performs textual interpolation.
fn render_value(value: &PropertyValue, params: &BTreeMap<String, PropertyValue>, re: &Regex) -> PropertyValue {
    match value {
        PropertyValue::String(s) => {
            if let Some(caps) = re.captures(s) {
                if caps.get(0).map(|m| m.as_str()) == Some(s.as_str()) {
                    if let Some(native) = params.get(&caps[1]) {
                        return native.clone();
                    }
                }
            }
            PropertyValue::String(render_string(s, params, re))
        }
        PropertyValue::List(items) => {
            PropertyValue::List(items.iter().map(|v| render_value(v, params, re)).collect())
        }
        PropertyValue::Map(map) => {
            PropertyValue::Map(map.iter().map(|(k, v)| (k.clone(), render_value(v, params, re))).collect())
        }
        other => other.clone(),
    }
}

/// Holds every registered `(name, version) -> WorkflowTemplate`.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<BTreeMap<(String, String), WorkflowTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, template: WorkflowTemplate) -> Result<(), TemplateError> {
        let key = (template.name.clone(), template.version.clone());
        let mut guard = self.templates.write().expect("template registry lock poisoned");
        if guard.contains_key(&key) {
            return Err(TemplateError::DuplicateTemplate { name: template.name, version: template.version });
        }
        guard.insert(key, template);
        Ok(())
    }

    /// Fetches a template by name. An empty `version` returns the highest
    /// registered version by numeric component comparison.
    pub fn get(&self, name: &str, version: &str) -> Result<WorkflowTemplate, TemplateError> {
        let guard = self.templates.read().expect("template registry lock poisoned");
        if version.is_empty() {
            return guard
                .iter()
                .filter(|((n, _), _)| n == name)
                .max_by_key(|((_, v), _)| version_key(v))
                .map(|(_, t)| t.clone())
                .ok_or_else(|| TemplateError::NoVersions { name: name.to_string() });
        }
        guard
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(format!("{name}@{version}")))
    }

    /// Validates parameters (applying declared defaults), then substitutes
    /// placeholders into a fresh set of [`CapabilityDeclaration`]s.
    pub fn resolve(
        &self,
        name: &str,
        version: &str,
        params: &BTreeMap<String, PropertyValue>,
    ) -> Result<Vec<CapabilityDeclaration>, TemplateError> {
        let template = self.get(name, version)?;
        let mut resolved_params = params.clone();

        for param in &template.parameters {
            if !resolved_params.contains_key(&param.name) {
                match &param.default {
                    Some(default) => {
                        resolved_params.insert(param.name.clone(), default.clone());
                    }
                    None if param.required => {
                        return Err(TemplateError::MissingParameter(param.name.clone()));
                    }
                    None => {}
                }
            }

            if let Some(pattern) = &param.validation_regex {
                if let Some(PropertyValue::String(value)) = resolved_params.get(&param.name) {
                    let re = Regex::new(pattern).map_err(|_| TemplateError::PatternMismatch {
                        name: param.name.clone(),
                        pattern: pattern.clone(),
                    })?;
                    if !re.is_match(value) {
                        return Err(TemplateError::PatternMismatch { name: param.name.clone(), pattern: pattern.clone() });
                    }
                }
            }
        }

        let re = placeholder_regex();
        let declarations = template
            .declarations
            .iter()
            .map(|decl| CapabilityDeclaration {
                name: render_string(&decl.name, &resolved_params, &re),
                capability_type: render_string(&decl.capability_type, &resolved_params, &re),
                tier: decl.tier,
                properties: decl
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), render_value(v, &resolved_params, &re)))
                    .collect(),
                constraints: decl.constraints.clone(),
                depends_on: decl.depends_on.iter().map(|d| render_string(d, &resolved_params, &re)).collect(),
            })
            .collect();

        Ok(declarations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_domain::Tier;

    fn sample_template() -> WorkflowTemplate {
        WorkflowTemplate {
            name: "web-app".to_string(),
            version: "1.0.0".to_string(),
            parameters: vec![
                TemplateParameter::required("app_name"),
                TemplateParameter::optional("replicas", PropertyValue::Int(2)),
                TemplateParameter::required("region").with_regex("^us-[a-z]+-[0-9]$"),
            ],
            declarations: vec![
                CapabilityDeclaration::new("${app_name}-service", "container_runtime", Tier::Application)
                    .with_property("replicas", PropertyValue::from("${replicas}"))
                    .with_property("hostname", PropertyValue::from("${app_name}.${region}.internal")),
            ],
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = TemplateRegistry::new();
        registry.register(sample_template()).unwrap();
        let err = registry.register(sample_template()).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateTemplate { .. }));
    }

    #[test]
    fn empty_version_returns_highest() {
        let registry = TemplateRegistry::new();
        registry.register(sample_template()).unwrap();
        let mut v2 = sample_template();
        v2.version = "1.10.0".to_string();
        registry.register(v2).unwrap();

        let fetched = registry.get("web-app", "").unwrap();
        assert_eq!(fetched.version, "1.10.0");
    }

    #[test]
    fn resolve_applies_defaults_and_substitutes() {
        let registry = TemplateRegistry::new();
        registry.register(sample_template()).unwrap();

        let mut params = BTreeMap::new();
        params.insert("app_name".to_string(), PropertyValue::from("checkout"));
        params.insert("region".to_string(), PropertyValue::from("us-east-1"));

        let decls = registry.resolve("web-app", "1.0.0", &params).unwrap();
        assert_eq!(decls[0].name, "checkout-service");
        assert_eq!(decls[0].properties.get("hostname").unwrap().as_str(), Some("checkout.us-east-1.internal"));
    }

    #[test]
    fn exact_placeholder_preserves_native_type() {
        let registry = TemplateRegistry::new();
        registry.register(sample_template()).unwrap();

        let mut params = BTreeMap::new();
        params.insert("app_name".to_string(), PropertyValue::from("checkout"));
        params.insert("region".to_string(), PropertyValue::from("us-east-1"));
        params.insert("replicas".to_string(), PropertyValue::Int(5));

        let decls = registry.resolve("web-app", "1.0.0", &params).unwrap();
        assert_eq!(decls[0].properties.get("replicas"), Some(&PropertyValue::Int(5)));
    }

    #[test]
    fn missing_required_parameter_fails() {
        let registry = TemplateRegistry::new();
        registry.register(sample_template()).unwrap();
        let params = BTreeMap::new();
        let err = registry.resolve("web-app", "1.0.0", &params).unwrap_err();
        assert!(matches!(err, TemplateError::MissingParameter(_)));
    }

    #[test]
    fn regex_validation_rejects_bad_region() {
        let registry = TemplateRegistry::new();
        registry.register(sample_template()).unwrap();
        let mut params = BTreeMap::new();
        params.insert("app_name".to_string(), PropertyValue::from("checkout"));
        params.insert("region".to_string(), PropertyValue::from("eu-1"));
        let err = registry.resolve("web-app", "1.0.0", &params).unwrap_err();
        assert!(matches!(err, TemplateError::PatternMismatch { .. }));
    }
}
