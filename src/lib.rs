//! Schema-driven form engine.
//!
//! A [`Schema`] declares fields and their constraints; a [`FormController`]
//! owns the live [`Snapshot`] and error map, applies edits, and on submit
//! validates the visible fields and hands a normalized [`OutputRecord`] to
//! the registered callback.

pub mod condition;
pub mod controller;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod services;
pub mod snapshot;
pub mod validate;

pub use condition::Condition;
pub use controller::{FieldInput, FieldView, FormController, SubmitOutcome};
pub use error::{EditError, SchemaError};
pub use model::{
    FieldDescriptor, FieldKind, FormSpec, OptionValue, Predicate, Rule, Schema, SelectOption,
};
pub use normalize::{normalize, OutputRecord};
pub use rules::{is_required, is_visible};
pub use snapshot::{DateRange, RangePart, Snapshot, Value};
pub use validate::{validate, ErrorMap};
