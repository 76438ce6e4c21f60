use thiserror::Error;

/// Type violations in AS1 input.
///
/// Missing fields are never errors; these only fire when a value has the
/// wrong shape for the operation asked of it.
#[derive(Debug, Error)]
pub enum As1Error {
    /// A record was required but something else was given
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// An item being merged by id has no id
    #[error("item in {field} has no id")]
    MissingId { field: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
