//! Declarative predicates over a [`Snapshot`], so that `required` and
//! `visible_when` can be written in a schema file instead of code.
//!
//! Each node carries exactly one operator:
//!
//! ```yaml
//! visible_when: { field: country, equals: us }
//! required: { any: [ { field: age, filled: true }, { field: email, matches: "@" } ] }
//! ```

use crate::error::SchemaError;
use crate::snapshot::{Snapshot, Value};
use regex::Regex;
use serde::Deserialize;

#[derive(Clone, Debug)]
pub enum Condition {
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    OneOf { field: String, values: Vec<Value> },
    Filled { field: String, filled: bool },
    Matches { field: String, pattern: Regex },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn filled(field: impl Into<String>) -> Self {
        Condition::Filled {
            field: field.into(),
            filled: true,
        }
    }

    pub fn eval(&self, snap: &Snapshot) -> bool {
        match self {
            Condition::Equals { field, value } => snap.get(field).loosely_equals(value),
            Condition::NotEquals { field, value } => !snap.get(field).loosely_equals(value),
            Condition::OneOf { field, values } => {
                let cur = snap.get(field);
                values.iter().any(|v| cur.loosely_equals(v))
            }
            Condition::Filled { field, filled } => {
                let v = snap.get(field);
                let present = match v {
                    Value::Range(r) => r.is_complete(),
                    other => other.is_present(),
                };
                present == *filled
            }
            Condition::Matches { field, pattern } => match snap.get(field) {
                Value::Text(s) => pattern.is_match(s),
                Value::Number(n) => pattern.is_match(&n.to_string()),
                _ => false,
            },
            Condition::All(cs) => cs.iter().all(|c| c.eval(snap)),
            Condition::Any(cs) => cs.iter().any(|c| c.eval(snap)),
            Condition::Not(c) => !c.eval(snap),
        }
    }

    /// Field names this condition reads, in the order they appear.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Equals { field, .. }
            | Condition::NotEquals { field, .. }
            | Condition::OneOf { field, .. }
            | Condition::Filled { field, .. }
            | Condition::Matches { field, .. } => out.push(field),
            Condition::All(cs) | Condition::Any(cs) => {
                for c in cs {
                    c.collect_references(out);
                }
            }
            Condition::Not(c) => c.collect_references(out),
        }
    }
}

/// Wire shape of a condition node before the single-operator check.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionSpec {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    equals: Option<Value>,
    #[serde(default)]
    not_equals: Option<Value>,
    #[serde(default)]
    one_of: Option<Vec<Value>>,
    #[serde(default)]
    filled: Option<bool>,
    #[serde(default)]
    matches: Option<String>,
    #[serde(default)]
    all: Option<Vec<ConditionSpec>>,
    #[serde(default)]
    any: Option<Vec<ConditionSpec>>,
    #[serde(default)]
    not: Option<Box<ConditionSpec>>,
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let spec = ConditionSpec::deserialize(deserializer)?;
        from_spec(spec).map_err(serde::de::Error::custom)
    }
}

fn from_spec(spec: ConditionSpec) -> Result<Condition, SchemaError> {
    let ops = [
        spec.equals.is_some(),
        spec.not_equals.is_some(),
        spec.one_of.is_some(),
        spec.filled.is_some(),
        spec.matches.is_some(),
        spec.all.is_some(),
        spec.any.is_some(),
        spec.not.is_some(),
    ]
    .iter()
    .filter(|b| **b)
    .count();
    if ops != 1 {
        return Err(SchemaError::BadCondition(format!(
            "expected exactly one operator, found {ops}"
        )));
    }
    let combinator = spec.all.is_some() || spec.any.is_some() || spec.not.is_some();
    if combinator {
        if let Some(f) = &spec.field {
            return Err(SchemaError::BadCondition(format!(
                "'field: {f}' is not allowed on all/any/not"
            )));
        }
        if let Some(cs) = spec.all {
            return Ok(Condition::All(convert_all(cs)?));
        }
        if let Some(cs) = spec.any {
            return Ok(Condition::Any(convert_all(cs)?));
        }
        if let Some(c) = spec.not {
            return Ok(Condition::Not(Box::new(from_spec(*c)?)));
        }
    }
    let field = spec
        .field
        .ok_or_else(|| SchemaError::BadCondition("missing 'field'".into()))?;
    if let Some(value) = spec.equals {
        return Ok(Condition::Equals { field, value });
    }
    if let Some(value) = spec.not_equals {
        return Ok(Condition::NotEquals { field, value });
    }
    if let Some(values) = spec.one_of {
        return Ok(Condition::OneOf { field, values });
    }
    if let Some(filled) = spec.filled {
        return Ok(Condition::Filled { field, filled });
    }
    let pattern = spec.matches.unwrap_or_default();
    let re = Regex::new(&pattern).map_err(|source| SchemaError::BadPattern {
        pattern: pattern.clone(),
        source,
    })?;
    Ok(Condition::Matches { field, pattern: re })
}

fn convert_all(specs: Vec<ConditionSpec>) -> Result<Vec<Condition>, SchemaError> {
    specs.into_iter().map(from_spec).collect()
}
