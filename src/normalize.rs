use crate::model::{FieldKind, Schema};
use crate::snapshot::{Snapshot, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// The payload handed to the submit callback.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRecord {
    values: BTreeMap<String, Value>,
}

impl OutputRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
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

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Copy the snapshot and turn unset text fields into `""`.
///
/// Runs over the whole schema regardless of visibility: a field that was
/// filled and then hidden keeps its stale value in the output.
pub fn normalize(schema: &Schema, snap: &Snapshot) -> OutputRecord {
    let mut values = snap.clone().into_map();
    for field in schema.fields() {
        match field.kind {
            FieldKind::Text => {
                let slot = values.entry(field.name.clone()).or_default();
                if slot.is_unset() {
                    *slot = Value::Text(String::new());
                }
            }
            FieldKind::Number { .. } | FieldKind::Select { .. } | FieldKind::Range => {}
        }
    }
    OutputRecord { values }
}
