//! State merge engine: folds a partial update into a thread's full state.
//!
//! The merge is a pure function over JSON objects with per-field policies,
//! checked in this priority order:
//!
//! 1. `messages` (**append**): the partial's messages are concatenated onto
//!    the current history. A non-sequence current value is treated as empty;
//!    a non-sequence partial value falls back to replace.
//! 2. `workflow_data` (**shallow overlay**): the partial's keys are laid over
//!    the current bag (partial wins per key); a non-mapping value on either
//!    side degrades to replace.
//! 3. `thread_id`, `session_id` (**immutable-preserve**): once present in the
//!    current state, the partial's value is silently ignored.
//! 4. anything else (**replace**).
//!
//! The function is deterministic, side-effect free, and total: no combination
//! of well-formed JSON inputs makes it fail. Type mismatches degrade to
//! replace semantics instead of erroring.

use serde_json::{Map, Value};

use crate::state::{StateUpdate, WorkflowState};

/// Keys that are set exactly once, at thread creation, and preserved through
/// every subsequent merge.
pub const IMMUTABLE_KEYS: &[&str] = &["thread_id", "session_id"];

/// Merge a partial update into a current state, both as JSON objects.
///
/// Returns a new object; neither input is mutated.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use threadloom::merge::merge_partial_update;
///
/// let current = json!({"workflow_data": {"a": 1, "b": 2}, "thread_id": "t1"});
/// let partial = json!({"workflow_data": {"b": 3, "c": 4}, "thread_id": "t2"});
///
/// let merged = merge_partial_update(
///     current.as_object().unwrap(),
///     partial.as_object().unwrap(),
/// );
/// assert_eq!(merged["workflow_data"], json!({"a": 1, "b": 3, "c": 4}));
/// assert_eq!(merged["thread_id"], json!("t1"));
/// ```
#[must_use]
pub fn merge_partial_update(
    current: &Map<String, Value>,
    partial: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = current.clone();

    for (key, value) in partial {
        match key.as_str() {
            "messages" => merge_messages(&mut merged, value),
            "workflow_data" => merge_workflow_data(&mut merged, value),
            _ if IMMUTABLE_KEYS.contains(&key.as_str()) => {
                if !current.contains_key(key) {
                    merged.insert(key.clone(), value.clone());
                }
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

fn merge_messages(merged: &mut Map<String, Value>, value: &Value) {
    let Value::Array(new_messages) = value else {
        // Non-sequence partial: replace semantics.
        merged.insert("messages".to_string(), value.clone());
        return;
    };
    let mut combined = match merged.get("messages") {
        Some(Value::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };
    combined.extend(new_messages.iter().cloned());
    merged.insert("messages".to_string(), Value::Array(combined));
}

fn merge_workflow_data(merged: &mut Map<String, Value>, value: &Value) {
    let Value::Object(overlay) = value else {
        merged.insert("workflow_data".to_string(), value.clone());
        return;
    };
    let mut combined = match merged.get("workflow_data") {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };
    for (k, v) in overlay {
        combined.insert(k.clone(), v.clone());
    }
    merged.insert("workflow_data".to_string(), Value::Object(combined));
}

impl WorkflowState {
    /// Apply a node's partial update, returning the merged state.
    ///
    /// Goes through [`merge_partial_update`] so typed and JSON-level callers
    /// share one merge implementation.
    #[must_use]
    pub fn merged(&self, update: &StateUpdate) -> WorkflowState {
        let merged = merge_partial_update(&self.to_map(), &update.to_map());
        WorkflowState::from_map(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn messages_append() {
        let current = obj(json!({"messages": [{"content": "a"}]}));
        let partial = obj(json!({"messages": [{"content": "b"}]}));
        let merged = merge_partial_update(&current, &partial);
        let messages = merged["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["content"], "b");
    }

    #[test]
    fn messages_append_onto_malformed_current() {
        let current = obj(json!({"messages": "garbage"}));
        let partial = obj(json!({"messages": [{"content": "b"}]}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn non_sequence_partial_messages_replace() {
        let current = obj(json!({"messages": [{"content": "a"}]}));
        let partial = obj(json!({"messages": 7}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["messages"], json!(7));
    }

    #[test]
    fn workflow_data_shallow_overlay() {
        let current = obj(json!({"workflow_data": {"a": 1, "b": 2}}));
        let partial = obj(json!({"workflow_data": {"b": 3, "c": 4}}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["workflow_data"], json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn non_mapping_workflow_data_replaces_bag() {
        let current = obj(json!({"workflow_data": {"a": 1}}));
        let partial = obj(json!({"workflow_data": [1, 2]}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["workflow_data"], json!([1, 2]));
    }

    #[test]
    fn immutable_keys_preserved() {
        let current = obj(json!({"thread_id": "t1", "session_id": "s1"}));
        let partial = obj(json!({"thread_id": "t2", "session_id": "s2"}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["thread_id"], json!("t1"));
        assert_eq!(merged["session_id"], json!("s1"));
    }

    #[test]
    fn immutable_keys_set_when_absent() {
        let current = obj(json!({}));
        let partial = obj(json!({"thread_id": "t1"}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["thread_id"], json!("t1"));
    }

    #[test]
    fn other_keys_replace() {
        let current = obj(json!({"current_step": "start", "is_processing": true}));
        let partial = obj(json!({"current_step": "done", "is_processing": false}));
        let merged = merge_partial_update(&current, &partial);
        assert_eq!(merged["current_step"], json!("done"));
        assert_eq!(merged["is_processing"], json!(false));
    }

    #[test]
    fn typed_merge_matches_json_merge() {
        let state = WorkflowState::new("t1", Message::user("hello"));
        let update = StateUpdate::new()
            .with_current_step("greeted")
            .with_messages(vec![Message::assistant("hi there")])
            .with_data("score", json!(0.9));

        let merged = state.merged(&update);
        assert_eq!(merged.current_step, "greeted");
        assert_eq!(merged.messages.len(), 2);
        assert_eq!(merged.workflow_data["score"], json!(0.9));
        // Immutable across the typed path as well.
        assert_eq!(merged.thread_id.as_deref(), Some("t1"));
    }
}
