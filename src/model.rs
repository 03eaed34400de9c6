use crate::condition::Condition;
use crate::error::SchemaError;
use crate::snapshot::{InitialData, Snapshot};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A snapshot predicate: either a declarative [`Condition`] from a schema
/// file or an arbitrary closure supplied in code.
#[derive(Clone)]
pub enum Predicate {
    When(Condition),
    Func(Arc<dyn Fn(&Snapshot) -> bool + Send + Sync>),
}

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Snapshot) -> bool + Send + Sync + 'static,
    {
        Predicate::Func(Arc::new(f))
    }

    pub fn eval(&self, snap: &Snapshot) -> bool {
        match self {
            Predicate::When(c) => c.eval(snap),
            Predicate::Func(f) => f(snap),
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Predicate::When(c) => Some(c),
            Predicate::Func(_) => None,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::When(c) => f.debug_tuple("When").field(c).finish(),
            Predicate::Func(_) => f.write_str("Func(<closure>)"),
        }
    }
}

impl From<Condition> for Predicate {
    fn from(c: Condition) -> Self {
        Predicate::When(c)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Condition::deserialize(deserializer).map(Predicate::When)
    }
}

/// Required-ness of a field: a fixed literal or a predicate over the snapshot.
#[derive(Clone, Debug)]
pub enum Rule {
    Literal(bool),
    Predicate(Predicate),
}

impl Default for Rule {
    fn default() -> Self {
        Rule::Literal(false)
    }
}

impl Rule {
    pub fn eval(&self, snap: &Snapshot) -> bool {
        match self {
            Rule::Literal(b) => *b,
            Rule::Predicate(p) => p.eval(snap),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleRepr {
    Literal(bool),
    When(Condition),
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match RuleRepr::deserialize(deserializer)? {
            RuleRepr::Literal(b) => Rule::Literal(b),
            RuleRepr::When(c) => Rule::Predicate(Predicate::When(c)),
        })
    }
}

/// Select option values may be strings or numbers.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SelectOption {
    pub value: OptionValue,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: OptionValue::Text(value.into()),
            label: label.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    // `step` is a hint for input controls; validation ignores it.
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        step: Option<f64>,
    },
    Select {
        #[serde(default)]
        options: Vec<SelectOption>,
    },
    #[serde(alias = "date_range")]
    Range,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number { .. } => "number",
            FieldKind::Select { .. } => "select",
            FieldKind::Range => "range",
        }
    }
}

/// Static declaration of one form field.
#[derive(Clone, Debug, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: Rule,
    #[serde(default)]
    pub visible_when: Option<Predicate>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: Rule::default(),
            visible_when: None,
            kind,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Number {
                min: None,
                max: None,
                step: None,
            },
        )
    }

    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::new(name, label, FieldKind::Select { options })
    }

    pub fn range(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Range)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Rule::Literal(required);
        self
    }

    pub fn required_when(mut self, p: impl Into<Predicate>) -> Self {
        self.required = Rule::Predicate(p.into());
        self
    }

    pub fn visible_when(mut self, p: impl Into<Predicate>) -> Self {
        self.visible_when = Some(p.into());
        self
    }

    /// Set numeric bounds; no effect on non-number fields.
    pub fn bounds(mut self, lo: Option<f64>, hi: Option<f64>) -> Self {
        if let FieldKind::Number { min, max, .. } = &mut self.kind {
            *min = lo;
            *max = hi;
        }
        self
    }

    pub fn step(mut self, s: f64) -> Self {
        if let FieldKind::Number { step, .. } = &mut self.kind {
            *step = Some(s);
        }
        self
    }

    /// Label of the option whose value renders as `raw`, if any.
    pub fn option_label(&self, raw: &str) -> Option<&str> {
        match &self.kind {
            FieldKind::Select { options } => options
                .iter()
                .find(|o| o.value.to_string() == raw)
                .map(|o| o.label.as_str()),
            _ => None,
        }
    }
}

/// Ordered, name-unique sequence of field descriptors. Order is render order
/// and validation order.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, f) in fields.iter().enumerate() {
            if !seen.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    name: f.name.clone(),
                    index,
                });
            }
        }
        for f in &fields {
            let preds = [
                match &f.required {
                    Rule::Predicate(p) => Some(p),
                    Rule::Literal(_) => None,
                },
                f.visible_when.as_ref(),
            ];
            for cond in preds.into_iter().flatten().filter_map(Predicate::condition) {
                if let Some(r) = cond.references().into_iter().find(|r| !seen.contains(r)) {
                    return Err(SchemaError::UnknownReference {
                        field: f.name.clone(),
                        reference: r.to_string(),
                    });
                }
            }
            if let FieldKind::Number {
                min: Some(lo),
                max: Some(hi),
                ..
            } = f.kind
            {
                if lo > hi {
                    tracing::warn!(field = %f.name, min = lo, max = hi, "number bounds are inverted");
                }
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A form as written in a YAML/JSON file.
#[derive(Debug, Deserialize)]
pub struct FormSpec {
    #[serde(default)]
    pub title: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub initial: InitialData,
}

impl FormSpec {
    pub fn into_parts(self) -> Result<(Option<String>, Schema, InitialData), SchemaError> {
        let schema = Schema::new(self.fields)?;
        Ok((self.title, schema, self.initial))
    }
}
