use crate::error::EditError;
use crate::model::{FieldDescriptor, FieldKind, Schema};
use crate::normalize::{normalize, OutputRecord};
use crate::rules::{is_required, is_visible};
use crate::snapshot::{InitialData, RangePart, Snapshot, Value};
use crate::validate::{self, ErrorMap};

/// Callback invoked with the normalized record after a clean submit.
pub type SubmitHandler = Box<dyn FnMut(&OutputRecord)>;

/// One edit event from an input control.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldInput {
    /// Raw text from a scalar control. Number fields coerce it: `""` becomes
    /// unset, numeric text becomes a number.
    Raw(String),
    /// Replace one end of a range, keeping the other.
    Part(RangePart, String),
    /// Set an already-typed value.
    Set(Value),
}

impl FieldInput {
    pub fn raw(s: impl Into<String>) -> Self {
        FieldInput::Raw(s.into())
    }

    pub fn start(s: impl Into<String>) -> Self {
        FieldInput::Part(RangePart::Start, s.into())
    }

    pub fn end(s: impl Into<String>) -> Self {
        FieldInput::Part(RangePart::End, s.into())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    Submitted(OutputRecord),
    Rejected { errors: usize },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

/// What the presentation layer needs to draw one visible field.
#[derive(Clone, Debug)]
pub struct FieldView<'a> {
    pub field: &'a FieldDescriptor,
    pub value: &'a Value,
    pub error: Option<&'a str>,
    pub required: bool,
}

/// Owns the snapshot and error map of one form instance.
///
/// Every operation completes its whole state change before returning, so a
/// caller never observes a snapshot update without the matching error map.
pub struct FormController {
    schema: Schema,
    initial: Snapshot,
    snapshot: Snapshot,
    errors: ErrorMap,
    on_submit: Option<SubmitHandler>,
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("fields", &self.schema.len())
            .field("snapshot", &self.snapshot)
            .field("errors", &self.errors)
            .finish()
    }
}

impl FormController {
    pub fn new(schema: Schema, initial: &InitialData) -> Self {
        let snapshot = Snapshot::from_schema(&schema, initial);
        Self {
            schema,
            initial: snapshot.clone(),
            snapshot,
            errors: ErrorMap::new(),
            on_submit: None,
        }
    }

    pub fn on_submit<F>(mut self, f: F) -> Self
    where
        F: FnMut(&OutputRecord) + 'static,
    {
        self.on_submit = Some(Box::new(f));
        self
    }

    pub fn set_on_submit(&mut self, handler: SubmitHandler) {
        self.on_submit = Some(handler);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn value(&self, name: &str) -> &Value {
        self.snapshot.get(name)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        self.snapshot != self.initial
    }

    /// Apply an edit and drop any displayed error for that field. Nothing is
    /// re-validated here.
    pub fn edit(&mut self, name: &str, input: FieldInput) -> Result<(), EditError> {
        let field = match self.schema.field(name) {
            Some(f) => f,
            None => {
                tracing::warn!(field = name, "edit for unknown field");
                return Err(EditError::UnknownField(name.to_string()));
            }
        };
        let next = coerce(field, self.snapshot.get(name), input).map_err(|e| {
            tracing::warn!(field = name, error = %e, "edit rejected");
            e
        })?;
        tracing::debug!(field = name, value = %next, "edit");
        self.snapshot.set(name, next);
        self.errors.remove(name);
        Ok(())
    }

    /// Re-check a single field and update only its entry in the error map.
    pub fn validate_field(&mut self, name: &str) -> Option<&str> {
        let msg = self
            .schema
            .field(name)
            .and_then(|f| validate::validate_field(f, &self.snapshot));
        match msg {
            Some(m) => {
                self.errors.insert(name.to_string(), m);
            }
            None => {
                self.errors.remove(name);
            }
        }
        self.error(name)
    }

    /// Validate every visible field against the current snapshot and replace
    /// the error map. On success the normalized record goes to the submit
    /// callback, once.
    pub fn submit(&mut self) -> SubmitOutcome {
        self.errors = validate::validate(&self.schema, &self.snapshot);
        if !self.errors.is_empty() {
            let fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
            tracing::info!(errors = self.errors.len(), ?fields, "form validation failed");
            return SubmitOutcome::Rejected {
                errors: self.errors.len(),
            };
        }
        let record = normalize(&self.schema, &self.snapshot);
        tracing::info!(fields = record.len(), "form submitted");
        if let Some(cb) = self.on_submit.as_mut() {
            cb(&record);
        }
        SubmitOutcome::Submitted(record)
    }

    /// Restore the initial snapshot and clear all errors.
    pub fn reset(&mut self) {
        self.snapshot = self.initial.clone();
        self.errors.clear();
        tracing::debug!("form reset");
    }

    /// Visible fields in schema order with their current presentation state.
    pub fn field_views(&self) -> Vec<FieldView<'_>> {
        self.schema
            .fields()
            .iter()
            .filter(|f| is_visible(f, &self.snapshot))
            .map(|f| FieldView {
                field: f,
                value: self.snapshot.get(&f.name),
                error: self.error(&f.name),
                required: is_required(f, &self.snapshot),
            })
            .collect()
    }
}

fn coerce(field: &FieldDescriptor, current: &Value, input: FieldInput) -> Result<Value, EditError> {
    match (&field.kind, input) {
        (FieldKind::Range, FieldInput::Part(part, s)) => {
            let base = current.as_range().cloned().unwrap_or_default();
            Ok(Value::Range(base.with_part(part, s)))
        }
        (FieldKind::Range, FieldInput::Set(v @ Value::Range(_))) => Ok(v),
        (FieldKind::Range, _) => Err(EditError::RangeNeedsPart(field.name.clone())),
        (_, FieldInput::Part(..)) => Err(EditError::NotARange(field.name.clone())),
        (FieldKind::Number { .. }, FieldInput::Raw(s))
        | (FieldKind::Number { .. }, FieldInput::Set(Value::Text(s))) => Ok(coerce_number(&s)),
        (FieldKind::Text | FieldKind::Select { .. }, FieldInput::Raw(s)) => Ok(Value::Text(s)),
        (_, FieldInput::Set(Value::Range(_))) => Err(EditError::NotARange(field.name.clone())),
        (_, FieldInput::Set(v)) => Ok(v),
    }
}

// Number fields only ever hold a number or nothing. Text is read up to its
// longest numeric prefix, so "45x" is 45 and "abc" is unset.
fn coerce_number(s: &str) -> Value {
    match leading_number(s) {
        Some(n) => Value::Number(n),
        None => Value::Unset,
    }
}

/// Longest prefix of `s` (after leading whitespace) that reads as a decimal
/// number, with optional sign, fraction and exponent.
fn leading_number(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let b = t.as_bytes();
    let digits = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i = 1;
    }
    if t[i..].starts_with("Infinity") {
        return t[..i + "Infinity".len()].parse().ok();
    }
    let int_end = digits(i);
    let mut mantissa = int_end - i;
    i = int_end;
    if b.get(i) == Some(&b'.') {
        let frac_end = digits(i + 1);
        mantissa += frac_end - (i + 1);
        if mantissa > 0 {
            i = frac_end;
        }
    }
    if mantissa == 0 {
        return None;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut k = i + 1;
        if matches!(b.get(k), Some(b'+' | b'-')) {
            k += 1;
        }
        let exp_end = digits(k);
        if exp_end > k {
            i = exp_end;
        }
    }
    t[..i].parse().ok()
}
