//! Total conversion of results into JSON-safe values.
//!
//! Envelopes returned to callers must always serialize, whatever a node put
//! into state. [`to_json_safe`] never fails: anything `serde_json` rejects
//! (non-string map keys, non-finite floats) degrades to its `Debug` string,
//! and non-finite floats inside an otherwise valid tree become `null` via
//! serde_json's own lossy float handling.

use serde::Serialize;
use serde_json::Value;

use crate::state::WorkflowState;

/// Serialize any value into JSON, degrading to a string representation when
/// strict serialization fails.
pub fn to_json_safe<T: Serialize + std::fmt::Debug>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{value:?}")))
}

/// A thread state as the JSON object callers see.
///
/// Infallible: state fields are plain JSON data by construction.
#[must_use]
pub fn state_to_value(state: &WorkflowState) -> Value {
    Value::Object(state.to_map())
}
