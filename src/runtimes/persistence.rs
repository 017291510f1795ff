//! Wire form for persisted checkpoints.
//!
//! Storage backends speak [`PersistedCheckpoint`]: state as an open JSON
//! object, the frontier as encoded node-name strings, and timestamps in
//! RFC 3339. Decoding is total over what [`encode`](PersistedCheckpoint::encode)
//! produces; a corrupted state object degrades through
//! [`WorkflowState::from_map`] instead of failing the load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::checkpointer::{Checkpoint, CheckpointerError};
use crate::state::WorkflowState;
use crate::types::NodeName;

/// Serializable image of a [`Checkpoint`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedCheckpoint {
    pub thread_id: String,
    pub step: u64,
    /// Full thread state as an open JSON object.
    pub state: Map<String, Value>,
    /// Frontier in encoded string form ("End" is the terminal sentinel).
    pub next_nodes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PersistedCheckpoint {
    /// Convert a runtime checkpoint into its wire form.
    #[must_use]
    pub fn encode(checkpoint: &Checkpoint) -> Self {
        Self {
            thread_id: checkpoint.thread_id.clone(),
            step: checkpoint.step,
            state: checkpoint.state.to_map(),
            next_nodes: checkpoint.next_nodes.iter().map(NodeName::encode).collect(),
            created_at: checkpoint.created_at,
        }
    }

    /// Rebuild the runtime checkpoint.
    #[must_use]
    pub fn decode(self) -> Checkpoint {
        Checkpoint {
            thread_id: self.thread_id,
            step: self.step,
            state: WorkflowState::from_map(self.state),
            next_nodes: self
                .next_nodes
                .iter()
                .map(|s| NodeName::decode(s))
                .collect(),
            created_at: self.created_at,
        }
    }

    /// Serialize to the JSON value stored in backend rows.
    pub fn to_value(&self) -> Result<Value, CheckpointerError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a backend row payload.
    pub fn from_value(payload: Value) -> Result<Self, CheckpointerError> {
        Ok(serde_json::from_value(payload)?)
    }
}
