//! Thread state and partial updates.
//!
//! [`WorkflowState`] is the unit of persisted truth for one thread.
//! [`StateUpdate`] is the subset of fields a node returns after running; the
//! merge engine ([`crate::merge`]) folds updates into the full state using
//! per-field policies (append, shallow overlay, immutable-preserve, replace).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::Message;

/// The `current_step` tag assigned when a thread is created.
pub const STEP_START: &str = "start";
/// The `current_step` tag assigned when a node fails.
pub const STEP_ERROR: &str = "error";

/// The key in `workflow_data` under which node failures are recorded.
pub const ERROR_DATA_KEY: &str = "error";

/// The full state of one workflow thread.
///
/// Persisted after every node execution. `thread_id` and `session_id` are
/// immutable once set: the merge engine silently discards any attempt by a
/// partial update to overwrite them. `messages` is append-only across steps.
/// `workflow_data` is an open extensibility bag that nodes shallow-merge
/// their output into. Keys outside the known fields are retained verbatim in
/// `rest` so merge and serialization stay total over open-shaped input.
///
/// # Examples
///
/// ```
/// use threadloom::message::Message;
/// use threadloom::state::WorkflowState;
///
/// let state = WorkflowState::new("thread-1", Message::user("hello"));
/// assert_eq!(state.current_step, "start");
/// assert_eq!(state.thread_id.as_deref(), Some("thread-1"));
/// assert_eq!(state.messages.len(), 1);
/// assert!(state.is_processing);
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Conversation history, append-only; insertion order = conversation order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Tag of the last node that ran, or [`STEP_START`] / [`STEP_ERROR`].
    #[serde(default)]
    pub current_step: String,
    /// Immutable thread identifier, assigned at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Immutable session identifier. Assigned the thread id at creation;
    /// kept as a distinct field for wire compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Open key-value bag for node-specific output, shallow-merged per update.
    #[serde(default)]
    pub workflow_data: Map<String, Value>,
    /// Set while a start/resume call is driving the thread.
    #[serde(default)]
    pub is_processing: bool,
    /// Any other top-level keys carried by updates; replace semantics.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl WorkflowState {
    /// Seed state for a fresh thread: the supplied message appended to an
    /// empty history, `current_step = "start"`, thread and session ids bound
    /// to `thread_id`, and the processing flag raised.
    #[must_use]
    pub fn new(thread_id: &str, initial_message: Message) -> Self {
        Self {
            messages: vec![initial_message],
            current_step: STEP_START.to_string(),
            thread_id: Some(thread_id.to_string()),
            session_id: Some(thread_id.to_string()),
            workflow_data: Map::new(),
            is_processing: true,
            rest: Map::new(),
        }
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True if the last recorded step was a node failure.
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.current_step == STEP_ERROR
    }

    /// Serialize into a JSON object for the merge engine.
    ///
    /// Infallible by construction: every field of `WorkflowState` is itself
    /// plain JSON data.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Struct serialization always yields an object.
            _ => Map::new(),
        }
    }

    /// Rebuild from a JSON object, tolerating missing or oddly-typed fields.
    ///
    /// Unknown keys land in `rest`; a non-array `messages` or non-object
    /// `workflow_data` is dropped rather than failing, keeping state
    /// reconstruction total over anything the merge engine can produce.
    #[must_use]
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        // Drop type-mismatched known fields up front so deserialization of
        // the remainder cannot fail.
        if !map.get("messages").map(Value::is_array).unwrap_or(true) {
            map.remove("messages");
        }
        if !map
            .get("workflow_data")
            .map(Value::is_object)
            .unwrap_or(true)
        {
            map.remove("workflow_data");
        }
        for key in ["current_step", "thread_id", "session_id"] {
            if !map.get(key).map(Value::is_string).unwrap_or(true) {
                map.remove(key);
            }
        }
        if !map
            .get("is_processing")
            .map(Value::is_boolean)
            .unwrap_or(true)
        {
            map.remove("is_processing");
        }
        // Malformed message entries degrade to defaults instead of erroring.
        if let Some(Value::Array(items)) = map.remove("messages") {
            let messages: Vec<Message> = items
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap_or_default())
                .collect();
            map.insert(
                "messages".to_string(),
                serde_json::to_value(&messages).unwrap_or(Value::Array(vec![])),
            );
        }
        serde_json::from_value(Value::Object(map)).unwrap_or_default()
    }
}

/// Partial state update returned by node execution.
///
/// All fields are optional; a node sets only what changed. Open keys are
/// carried in the flattened `extra` map and get replace semantics when
/// merged. Builder methods follow the usual fluent pattern:
///
/// ```
/// use threadloom::message::Message;
/// use threadloom::state::StateUpdate;
/// use serde_json::json;
///
/// let update = StateUpdate::new()
///     .with_current_step("input_processed")
///     .with_messages(vec![Message::assistant("got it")])
///     .with_data("processed_prompt", json!("summarize this"));
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Messages to append to the thread's history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    /// New `current_step` tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    /// Keys to overlay onto the thread's `workflow_data` bag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_data: Option<Map<String, Value>>,
    /// New processing flag value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_processing: Option<bool>,
    /// Any other top-level keys; replace semantics on merge.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set messages to append.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Set the step tag.
    #[must_use]
    pub fn with_current_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    /// Add one `workflow_data` key.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.workflow_data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Set the processing flag.
    #[must_use]
    pub fn with_processing(mut self, processing: bool) -> Self {
        self.is_processing = Some(processing);
        self
    }

    /// Serialize into a JSON object for the merge engine. Fields left unset
    /// are absent from the result, so the merge only touches what the node
    /// actually returned.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_state_seeds_all_fields() {
        let state = WorkflowState::new("t1", Message::user("hi"));
        assert_eq!(state.thread_id.as_deref(), Some("t1"));
        assert_eq!(state.session_id.as_deref(), Some("t1"));
        assert_eq!(state.current_step, STEP_START);
        assert_eq!(state.last_message().unwrap().content, "hi");
        assert!(state.workflow_data.is_empty());
    }

    #[test]
    fn map_roundtrip_preserves_open_keys() {
        let mut state = WorkflowState::new("t1", Message::user("hi"));
        state
            .rest
            .insert("user_input".to_string(), json!({"prompt": "x"}));
        let map = state.to_map();
        assert_eq!(map["user_input"], json!({"prompt": "x"}));
        let back = WorkflowState::from_map(map);
        assert_eq!(back, state);
    }

    #[test]
    fn from_map_tolerates_type_mismatches() {
        let mut map = Map::new();
        map.insert("messages".to_string(), json!("not a list"));
        map.insert("workflow_data".to_string(), json!(42));
        map.insert("is_processing".to_string(), json!("yes"));
        let state = WorkflowState::from_map(map);
        assert!(state.messages.is_empty());
        assert!(state.workflow_data.is_empty());
        assert!(!state.is_processing);
    }

    #[test]
    fn update_map_omits_unset_fields() {
        let update = StateUpdate::new().with_current_step("done");
        let map = update.to_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map["current_step"], json!("done"));
    }

    #[test]
    fn update_builder_accumulates_data_keys() {
        let update = StateUpdate::new()
            .with_data("a", json!(1))
            .with_data("b", json!(2));
        let data = update.workflow_data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data["b"], json!(2));
    }
}
