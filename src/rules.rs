//! Visibility and required-ness, derived fresh from a snapshot on every
//! call. Nothing is cached.

use crate::model::{FieldDescriptor, Schema};
use crate::snapshot::Snapshot;

/// A field without a visibility predicate is always shown.
pub fn is_visible(field: &FieldDescriptor, snap: &Snapshot) -> bool {
    field
        .visible_when
        .as_ref()
        .map(|p| p.eval(snap))
        .unwrap_or(true)
}

pub fn is_required(field: &FieldDescriptor, snap: &Snapshot) -> bool {
    field.required.eval(snap)
}

/// Per-field visibility and required-ness for one snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldState {
    pub visible: bool,
    /// Only meaningful for visible fields; hidden fields report `false`.
    pub required: bool,
}

/// Evaluate every field in schema order.
pub fn evaluate(schema: &Schema, snap: &Snapshot) -> Vec<FieldState> {
    schema
        .fields()
        .iter()
        .map(|f| {
            let visible = is_visible(f, snap);
            FieldState {
                visible,
                required: visible && is_required(f, snap),
            }
        })
        .collect()
}
