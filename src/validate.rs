use crate::model::{FieldDescriptor, FieldKind, Schema};
use crate::rules::{is_required, is_visible};
use crate::snapshot::{Snapshot, Value};
use std::collections::BTreeMap;

/// Field name to message. A key is present only while that field has an
/// error.
pub type ErrorMap = BTreeMap<String, String>;

/// Validate every visible field in schema order. An empty map means the
/// snapshot may be submitted.
pub fn validate(schema: &Schema, snap: &Snapshot) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for field in schema.fields() {
        if let Some(msg) = validate_field(field, snap) {
            errors.insert(field.name.clone(), msg);
        }
    }
    errors
}

/// Check one field against the snapshot. Hidden fields never fail.
///
/// The required check runs first and the type checks after it; each later
/// failure replaces the earlier message, so at most one message survives.
pub fn validate_field(field: &FieldDescriptor, snap: &Snapshot) -> Option<String> {
    if !is_visible(field, snap) {
        return None;
    }
    let value = snap.get(&field.name);
    let mut error: Option<String> = None;

    if is_required(field, snap) {
        match field.kind {
            FieldKind::Range => {
                let complete = value.as_range().map(|r| r.is_complete()).unwrap_or(false);
                if !complete {
                    error = Some(format!(
                        "{} requires both start and end dates.",
                        field.label
                    ));
                }
            }
            FieldKind::Text | FieldKind::Number { .. } | FieldKind::Select { .. } => {
                if !value.is_present() {
                    error = Some(format!("{} is required.", field.label));
                }
            }
        }
    }

    if value.is_present() {
        match &field.kind {
            FieldKind::Number { min, max, .. } => {
                // Unparseable input compares false against both bounds.
                let n = value.as_number().unwrap_or(f64::NAN);
                if let Some(lo) = min {
                    if n < *lo {
                        error = Some(format!("{} must be at least {lo}.", field.label));
                    }
                }
                if let Some(hi) = max {
                    if n > *hi {
                        error = Some(format!("{} must be no more than {hi}.", field.label));
                    }
                }
            }
            FieldKind::Range => {
                if let Value::Range(r) = value {
                    if r.is_inverted() {
                        error = Some("End date cannot be before start date.".to_string());
                    }
                }
            }
            FieldKind::Text | FieldKind::Select { .. } => {}
        }
    }

    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::model::SelectOption;
    use crate::snapshot::DateRange;

    fn age_schema() -> Schema {
        Schema::new(vec![
            FieldDescriptor::number("age", "Age").bounds(Some(18.0), Some(30.0))
        ])
        .unwrap()
    }

    fn with(name: &str, v: Value) -> Snapshot {
        vec![(name, v)].into_iter().collect()
    }

    #[test]
    fn number_bounds_messages() {
        let s = age_schema();
        assert_eq!(
            validate(&s, &with("age", Value::Number(35.0))).get("age").map(String::as_str),
            Some("Age must be no more than 30.")
        );
        assert_eq!(
            validate(&s, &with("age", Value::Number(10.0))).get("age").map(String::as_str),
            Some("Age must be at least 18.")
        );
        assert!(validate(&s, &with("age", Value::Number(25.0))).is_empty());
        assert!(validate(&s, &with("age", Value::Number(18.0))).is_empty());
        assert!(validate(&s, &with("age", Value::Number(30.0))).is_empty());
    }

    #[test]
    fn fractional_bounds_render_plainly() {
        let s = Schema::new(vec![
            FieldDescriptor::number("ratio", "Ratio").bounds(Some(0.5), None)
        ])
        .unwrap();
        assert_eq!(
            validate(&s, &with("ratio", Value::Number(0.25)))["ratio"],
            "Ratio must be at least 0.5."
        );
    }

    #[test]
    fn numeric_text_is_parsed_before_comparison() {
        let s = age_schema();
        assert_eq!(
            validate(&s, &with("age", Value::text("40")))["age"],
            "Age must be no more than 30."
        );
        assert!(validate(&s, &with("age", Value::text("abc"))).is_empty());
    }

    #[test]
    fn max_overwrites_min_when_bounds_are_inverted() {
        let s = Schema::new(vec![
            FieldDescriptor::number("n", "N").bounds(Some(10.0), Some(5.0))
        ])
        .unwrap();
        assert_eq!(
            validate(&s, &with("n", Value::Number(7.0)))["n"],
            "N must be no more than 5."
        );
    }

    #[test]
    fn required_checks_per_kind() {
        let s = Schema::new(vec![
            FieldDescriptor::text("name", "Name").required(true),
            FieldDescriptor::number("age", "Age").required(true),
            FieldDescriptor::select("c", "Country", vec![SelectOption::new("us", "US")])
                .required(true),
            FieldDescriptor::range("dates", "Dates").required(true),
        ])
        .unwrap();
        let snap: Snapshot = vec![
            ("name", Value::text("")),
            ("age", Value::Unset),
            ("c", Value::Unset),
            (
                "dates",
                Value::Range(DateRange {
                    start: Some("2024-01-01".into()),
                    end: None,
                }),
            ),
        ]
        .into_iter()
        .collect();
        let errors = validate(&s, &snap);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors["name"], "Name is required.");
        assert_eq!(errors["age"], "Age is required.");
        assert_eq!(errors["c"], "Country is required.");
        assert_eq!(errors["dates"], "Dates requires both start and end dates.");
    }

    #[test]
    fn optional_empty_fields_pass() {
        let s = Schema::new(vec![
            FieldDescriptor::text("name", "Name"),
            FieldDescriptor::number("age", "Age").bounds(Some(18.0), None),
            FieldDescriptor::range("dates", "Dates"),
        ])
        .unwrap();
        let snap = Snapshot::from_schema(&s, &Default::default());
        assert!(validate(&s, &snap).is_empty());
    }

    #[test]
    fn inverted_range_is_an_order_violation() {
        let s = Schema::new(vec![FieldDescriptor::range("dates", "Dates").required(true)])
            .unwrap();
        let errors = validate(
            &s,
            &with(
                "dates",
                Value::Range(DateRange::new("2024-09-10", "2024-09-05")),
            ),
        );
        assert_eq!(errors["dates"], "End date cannot be before start date.");
        let ok = validate(
            &s,
            &with(
                "dates",
                Value::Range(DateRange::new("2024-09-05", "2024-09-05")),
            ),
        );
        assert!(ok.is_empty());
    }

    #[test]
    fn type_check_overwrites_required_failure_slot() {
        // Required predicate true, value present but below min: only the
        // bound message remains.
        let s = Schema::new(vec![FieldDescriptor::number("age", "Age")
            .bounds(Some(18.0), None)
            .required(true)])
        .unwrap();
        let errors = validate(&s, &with("age", Value::Number(3.0)));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["age"], "Age must be at least 18.");
    }

    #[test]
    fn hidden_fields_are_skipped() {
        let s = Schema::new(vec![
            FieldDescriptor::text("country", "Country"),
            FieldDescriptor::text("state", "State")
                .required(true)
                .visible_when(Condition::equals("country", "us")),
        ])
        .unwrap();
        let us = with("country", Value::text("us"));
        assert_eq!(validate(&s, &us)["state"], "State is required.");
        let ca = with("country", Value::text("ca"));
        assert!(validate(&s, &ca).is_empty());
    }
}
