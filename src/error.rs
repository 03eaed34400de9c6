use thiserror::Error;

/// Schema contract violations, reported when a schema is built or loaded.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate field name: '{name}' at index {index}")]
    DuplicateField { name: String, index: usize },
    #[error("field '{field}' refers to unknown field '{reference}'")]
    UnknownReference { field: String, reference: String },
    #[error("invalid condition: {0}")]
    BadCondition(String),
    #[error("invalid pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Edit events that do not fit the schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("unknown field: '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is not a range; start/end edits do not apply")]
    NotARange(String),
    #[error("field '{0}' is a range; edit its start or end instead")]
    RangeNeedsPart(String),
}
