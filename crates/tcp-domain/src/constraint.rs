use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Le,
    Ge,
    Eq,
    Ne,
    Lt,
    Gt,
    In,
    NotIn,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Operator> {
        match s {
            "<=" => Some(Operator::Le),
            ">=" => Some(Operator::Ge),
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            ">" => Some(Operator::Gt),
            "in" => Some(Operator::In),
            "not_in" => Some(Operator::NotIn),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::In => "in",
            Operator::NotIn => "not_in",
        };
        write!(f, "{}", s)
    }
}

/// A machine-checkable limit imposed by a parent tier on child tiers.
/// `operator` is kept as the raw string from config so an unrecognized
/// operator can still be represented (and then fail closed at evaluation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub field: String,
    pub operator: String,
    pub value: PropertyValue,
    pub source: String,
}

impl Constraint {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: PropertyValue, source: impl Into<String>) -> Self {
        Constraint {
            field: field.into(),
            operator: operator.into(),
            value,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub constraint: Constraint,
    pub actual: PropertyValue,
    pub message: String,
}

const EPSILON: f64 = 1e-9;

/// Parses a memory quantity (bare bytes, or suffixed Ki/Mi/Gi/Ti, binary
/// 1024-based) into a byte count.
pub fn parse_memory(s: &str) -> Option<f64> {
    let s = s.trim();
    let suffixes: &[(&str, f64)] = &[
        ("Ti", 1024f64.powi(4)),
        ("Gi", 1024f64.powi(3)),
        ("Mi", 1024f64.powi(2)),
        ("Ki", 1024f64),
    ];
    for (suf, mult) in suffixes {
        if let Some(prefix) = s.strip_suffix(suf) {
            return prefix.trim().parse::<f64>().ok().map(|n| n * mult);
        }
    }
    s.parse::<f64>().ok()
}

/// Parses a CPU quantity (`Nm` millicores, or a bare number meaning cores)
/// into a millicore count.
pub fn parse_cpu(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some(prefix) = s.strip_suffix('m') {
        return prefix.trim().parse::<f64>().ok();
    }
    s.parse::<f64>().ok().map(|n| n * 1000.0)
}

fn memory_str(v: &PropertyValue) -> Option<String> {
    match v {
        PropertyValue::String(s) => Some(s.clone()),
        PropertyValue::Int(i) => Some(i.to_string()),
        PropertyValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

/// Ordering between two property values using the precedence: memory,
/// then CPU, then numeric, then lexicographic string. Returns `None` only
/// when neither side yields any comparable representation (never happens
/// for the string fallback, which always succeeds).
fn compare(a: &PropertyValue, b: &PropertyValue) -> std::cmp::Ordering {
    if let (Some(sa), Some(sb)) = (memory_str(a), memory_str(b)) {
        if let (Some(ma), Some(mb)) = (parse_memory(&sa), parse_memory(&sb)) {
            if looks_like_memory(&sa) || looks_like_memory(&sb) {
                return cmp_f64(ma, mb);
            }
        }
        if let (Some(ca), Some(cb)) = (parse_cpu(&sa), parse_cpu(&sb)) {
            if looks_like_cpu(&sa) || looks_like_cpu(&sb) {
                return cmp_f64(ca, cb);
            }
        }
    }
    if let (Some(fa), Some(fb)) = (a.as_f64(), b.as_f64()) {
        return cmp_f64(fa, fb);
    }
    a.stringify().cmp(&b.stringify())
}

fn looks_like_memory(s: &str) -> bool {
    let s = s.trim();
    ["Ki", "Mi", "Gi", "Ti"].iter().any(|suf| s.ends_with(suf))
}

fn looks_like_cpu(s: &str) -> bool {
    let s = s.trim();
    s.ends_with('m') && s[..s.len() - 1].trim().parse::<f64>().is_ok()
}

fn cmp_f64(a: f64, b: f64) -> std::cmp::Ordering {
    if (a - b).abs() < EPSILON {
        std::cmp::Ordering::Equal
    } else if a < b {
        std::cmp::Ordering::Less
    } else {
        std::cmp::Ordering::Greater
    }
}

fn values_equal(a: &PropertyValue, b: &PropertyValue) -> bool {
    compare(a, b) == std::cmp::Ordering::Equal
}

/// Evaluates a single (property, constraint) pair. A missing property is
/// not a violation — validation is permissive for absent fields.
pub fn evaluate(constraint: &Constraint, actual: Option<&PropertyValue>) -> Option<ConstraintViolation> {
    use std::cmp::Ordering::*;

    let actual = actual?;
    let op = match Operator::parse(&constraint.operator) {
        Some(op) => op,
        None => {
            return Some(ConstraintViolation {
                constraint: constraint.clone(),
                actual: actual.clone(),
                message: format!("unknown operator '{}'", constraint.operator),
            })
        }
    };

    let ok = match op {
        Operator::Le => matches!(compare(actual, &constraint.value), Less | Equal),
        Operator::Ge => matches!(compare(actual, &constraint.value), Greater | Equal),
        Operator::Eq => values_equal(actual, &constraint.value),
        Operator::Ne => !values_equal(actual, &constraint.value),
        Operator::Lt => compare(actual, &constraint.value) == Less,
        Operator::Gt => compare(actual, &constraint.value) == Greater,
        Operator::In => match &constraint.value {
            PropertyValue::List(items) => items.iter().any(|item| values_equal(actual, item)),
            other => values_equal(actual, other),
        },
        Operator::NotIn => match &constraint.value {
            PropertyValue::List(items) => !items.iter().any(|item| values_equal(actual, item)),
            other => !values_equal(actual, other),
        },
    };

    if ok {
        None
    } else {
        Some(ConstraintViolation {
            constraint: constraint.clone(),
            actual: actual.clone(),
            message: format!(
                "field '{}' value {} does not satisfy {} {}",
                constraint.field,
                actual.stringify(),
                constraint.operator,
                constraint.value.stringify()
            ),
        })
    }
}

/// Evaluates every constraint against a property map, collecting all
/// violations rather than stopping at the first.
pub fn evaluate_all<'a>(
    constraints: &[Constraint],
    properties: &std::collections::BTreeMap<String, PropertyValue>,
) -> Vec<ConstraintViolation> {
    constraints
        .iter()
        .filter_map(|c| evaluate(c, properties.get(&c.field)))
        .collect()
}
