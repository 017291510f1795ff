use serde::{Deserialize, Serialize};

/// A message in a workflow conversation.
///
/// Messages are the primary data structure for communication between callers
/// and workflow threads. Each message carries a `role` (who said it), a
/// `kind` tag (serialized as `"type"`, used by nodes to classify payloads),
/// and text `content`. Messages are immutable once created: the merge engine
/// only ever appends them to a thread's history.
///
/// # Examples
///
/// ```
/// use threadloom::message::Message;
///
/// let user_msg = Message::user("What's the forecast?");
/// assert_eq!(user_msg.role, "user");
/// assert_eq!(user_msg.kind, "message");
///
/// // Nodes tag their output with a descriptive kind:
/// let reply = Message::new(Message::ASSISTANT, "respond_node_response", "Sunny.");
/// assert!(reply.has_role(Message::ASSISTANT));
/// ```
///
/// # Serialization
///
/// `kind` is serialized under the wire name `"type"` to match the external
/// message contract:
///
/// ```
/// use threadloom::message::Message;
///
/// let json = serde_json::to_string(&Message::user("hi")).unwrap();
/// assert!(json.contains("\"type\":\"message\""));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The text content of the message.
    #[serde(default)]
    pub content: String,
    /// Payload classification tag, serialized as `"type"`.
    #[serde(rename = "type", default = "Message::default_kind")]
    pub kind: String,
    /// The role of the message sender (e.g., "user", "assistant", "system").
    #[serde(default)]
    pub role: String,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";

    /// Default `kind` tag for messages that don't declare one.
    pub const DEFAULT_KIND: &'static str = "message";

    fn default_kind() -> String {
        Self::DEFAULT_KIND.to_string()
    }

    /// Creates a new message with the specified role, kind tag, and content.
    #[must_use]
    pub fn new(role: &str, kind: &str, content: &str) -> Self {
        Self {
            content: content.to_string(),
            kind: kind.to_string(),
            role: role.to_string(),
        }
    }

    /// Creates a user message with the default kind tag.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, Self::DEFAULT_KIND, content)
    }

    /// Creates an assistant message with the default kind tag.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, Self::DEFAULT_KIND, content)
    }

    /// Creates a system message with the default kind tag.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, Self::DEFAULT_KIND, content)
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}
