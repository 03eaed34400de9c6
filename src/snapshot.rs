use crate::model::{FieldKind, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Composite value held by range fields. Both ends are ISO calendar dates,
/// so lexicographic order is chronological order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangePart {
    Start,
    End,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref().filter(|s| !s.is_empty())
    }

    pub fn end(&self) -> Option<&str> {
        self.end.as_deref().filter(|s| !s.is_empty())
    }

    pub fn part(&self, part: RangePart) -> Option<&str> {
        match part {
            RangePart::Start => self.start(),
            RangePart::End => self.end(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.start().is_some() && self.end().is_some()
    }

    /// True only when both ends are set and the end precedes the start.
    pub fn is_inverted(&self) -> bool {
        match (self.start(), self.end()) {
            (Some(s), Some(e)) => e < s,
            _ => false,
        }
    }

    /// Replace one end, keeping the other untouched.
    pub fn with_part(&self, part: RangePart, value: String) -> Self {
        let mut next = self.clone();
        match part {
            RangePart::Start => next.start = Some(value),
            RangePart::End => next.end = Some(value),
        }
        next
    }
}

/// A field's current value.
///
/// Serializes as `null`, a string, a number, or `{start, end}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Unset,
    Text(String),
    Number(f64),
    Range(DateRange),
}

static UNSET: Value = Value::Unset;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Present means not unset and not the empty string. Range values are
    /// always present; whether both ends are filled is a separate question.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Unset => false,
            Value::Text(s) => !s.is_empty(),
            Value::Number(_) | Value::Range(_) => true,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Numeric reading of the value; text is parsed leniently.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&DateRange> {
        match self {
            Value::Range(r) => Some(r),
            _ => None,
        }
    }

    /// Loose scalar equality: numbers compare numerically even when one side
    /// is numeric text, strings compare exactly, unset never matches.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unset, _) | (_, Value::Unset) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Number(_), Value::Text(_)) | (Value::Text(_), Value::Number(_)) => {
                match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (Value::Range(a), Value::Range(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Range(r) => write!(
                f,
                "{} → {}",
                r.start().unwrap_or("…"),
                r.end().unwrap_or("…")
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<DateRange> for Value {
    fn from(r: DateRange) -> Self {
        Value::Range(r)
    }
}

/// Initial data supplied alongside a schema. Missing or `null` entries fall
/// back to the per-kind default.
pub type InitialData = BTreeMap<String, Value>;

/// Mapping from field name to current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Seed one entry per schema field: explicit initial values win, range
    /// fields default to an empty `{start, end}`, everything else to unset.
    pub fn from_schema(schema: &Schema, initial: &InitialData) -> Self {
        let mut values = BTreeMap::new();
        for field in schema.fields() {
            let seeded = match initial.get(&field.name) {
                Some(v) if !v.is_unset() => v.clone(),
                _ => match field.kind {
                    FieldKind::Range => Value::Range(DateRange::default()),
                    _ => Value::Unset,
                },
            };
            values.insert(field.name.clone(), seeded);
        }
        Self { values }
    }

    /// Value for `name`; unknown names read as unset.
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&UNSET)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDescriptor;
    use serde_json::json;

    #[test]
    fn from_schema_seeds_defaults_and_initial_values() {
        let schema = Schema::new(vec![
            FieldDescriptor::text("name", "Name"),
            FieldDescriptor::number("age", "Age"),
            FieldDescriptor::range("trip", "Trip"),
        ])
        .unwrap();
        let mut initial = InitialData::new();
        initial.insert("name".into(), Value::text("Jane"));
        initial.insert("age".into(), Value::Unset);
        let snap = Snapshot::from_schema(&schema, &initial);
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.get("name"), &Value::text("Jane"));
        assert_eq!(snap.get("age"), &Value::Unset);
        assert_eq!(snap.get("trip"), &Value::Range(DateRange::default()));
        assert_eq!(snap.get("missing"), &Value::Unset);
    }

    #[test]
    fn presence_rules() {
        assert!(!Value::Unset.is_present());
        assert!(!Value::text("").is_present());
        assert!(Value::text("x").is_present());
        assert!(Value::Number(0.0).is_present());
        assert!(Value::Range(DateRange::default()).is_present());
    }

    #[test]
    fn range_ordering_is_lexicographic() {
        let r = DateRange::new("2024-09-10", "2024-09-05");
        assert!(r.is_complete());
        assert!(r.is_inverted());
        let half = DateRange {
            start: Some("2024-09-10".into()),
            end: Some(String::new()),
        };
        assert!(!half.is_complete());
        assert!(!half.is_inverted());
        let merged = half.with_part(RangePart::End, "2024-09-12".into());
        assert_eq!(merged.start(), Some("2024-09-10"));
        assert_eq!(merged.end(), Some("2024-09-12"));
    }

    #[test]
    fn loose_equality_crosses_numeric_text() {
        assert!(Value::text("2").loosely_equals(&Value::Number(2.0)));
        assert!(!Value::text("two").loosely_equals(&Value::Number(2.0)));
        assert!(!Value::Unset.loosely_equals(&Value::Unset));
        assert!(Value::text("us").loosely_equals(&Value::text("us")));
    }

    #[test]
    fn values_serialize_to_plain_json() {
        let snap: Snapshot = vec![
            ("a", Value::Unset),
            ("b", Value::text("x")),
            ("c", Value::Number(25.0)),
            ("d", Value::Range(DateRange::new("2024-01-01", "2024-01-02"))),
        ]
        .into_iter()
        .collect();
        let m = snap.into_map();
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({
                "a": null,
                "b": "x",
                "c": 25.0,
                "d": {"start": "2024-01-01", "end": "2024-01-02"}
            })
        );
    }

    #[test]
    fn values_deserialize_from_json() {
        let v: Value = serde_json::from_value(json!(18)).unwrap();
        assert_eq!(v, Value::Number(18.0));
        let v: Value = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(v, Value::Unset);
        let v: Value = serde_json::from_value(json!({"start": "2024-01-01"})).unwrap();
        assert_eq!(
            v,
            Value::Range(DateRange {
                start: Some("2024-01-01".into()),
                end: None
            })
        );
    }
}
