//! Core identifier types for the workflow graph and thread lifecycle.
//!
//! [`NodeName`] identifies targets in the edge table, including the terminal
//! `End` sentinel. [`ThreadStatus`] is the caller-visible lifecycle state
//! derived from a persisted checkpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the target of an edge in a workflow graph.
///
/// Executable nodes are referenced by name; `End` is the virtual terminal
/// sentinel that completes a run. `End` is never registered as a node and is
/// never executed.
///
/// # Persistence
///
/// `NodeName` round-trips through a human-readable string form via
/// [`encode`](Self::encode)/[`decode`](Self::decode) so checkpoint frontiers
/// can be stored as plain JSON string arrays.
///
/// ```
/// use threadloom::types::NodeName;
///
/// assert_eq!(NodeName::End.encode(), "End");
/// assert_eq!(NodeName::decode("respond"), NodeName::Named("respond".into()));
/// assert_eq!(NodeName::decode("End"), NodeName::End);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeName {
    /// Terminal sentinel that completes workflow execution.
    End,
    /// An executable node, identified by its registered name.
    Named(String),
}

impl NodeName {
    /// Encode into the persisted string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeName::End => "End".to_string(),
            NodeName::Named(name) => name.clone(),
        }
    }

    /// Decode a persisted string form. `"End"` is reserved for the sentinel;
    /// anything else is a node name.
    pub fn decode(s: &str) -> Self {
        if s == "End" {
            NodeName::End
        } else {
            NodeName::Named(s.to_string())
        }
    }

    /// Returns `true` if this is the terminal sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns the node name for `Named` targets, `None` for `End`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeName::End => None,
            NodeName::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => write!(f, "End"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: allow string literals where a NodeName is expected.
impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        NodeName::decode(s)
    }
}

/// Caller-visible lifecycle state of a workflow thread.
///
/// Derived from the latest persisted checkpoint; a thread with no checkpoint
/// at all is unstarted and has no status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// The thread has pending nodes and is mid-execution.
    Running,
    /// The thread is paused at an interrupt point awaiting caller input.
    Interrupted,
    /// The thread reached the terminal sentinel; no further nodes will run.
    Completed,
    /// The last step recorded a node failure.
    Errored,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Completed => write!(f, "completed"),
            Self::Errored => write!(f, "errored"),
        }
    }
}
