//! Conversation message model
//!
//! Messages are stored and streamed in the same shape the chat frontend
//! consumes: a `type`-tagged object with snake_case variants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Id prefix for messages that clients should not render.
///
/// Synthesized tool responses carry this prefix so that the UI can hide
/// placeholder results while the model still sees a complete history.
pub const DO_NOT_RENDER_ID_PREFIX: &str = "do-not-render-";

// ============================================================================
// Identifier generation
// ============================================================================

/// Source of fresh message identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs (122 random bits, collisions are negligible)
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic ids for tests: `id-1`, `id-2`, ...
#[cfg(test)]
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        format!("id-{n}")
    }
}

// ============================================================================
// Tool calls
// ============================================================================

/// A model-issued request to invoke a named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Providers occasionally omit the id; it is treated as `""`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            args: into_object(args),
        }
    }

    /// Tool call without an identifier
    pub fn anonymous(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            args: into_object(args),
        }
    }

    /// The call's identifier, or `""` when absent
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Same call with its arguments replaced
    #[must_use]
    pub fn with_args(&self, args: Map<String, Value>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            args,
        }
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("input".to_string(), other);
            map
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Human {
        id: String,
        content: String,
    },
    Ai {
        id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        id: String,
        tool_call_id: String,
        name: String,
        content: String,
    },
    System {
        id: String,
        content: String,
    },
}

impl Message {
    pub fn human(id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Human {
            id: id.into(),
            content: content.into(),
        }
    }

    pub fn ai(id: impl Into<String>, content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Ai {
            id: id.into(),
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(
        id: impl Into<String>,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::Tool {
            id: id.into(),
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn system(id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::System {
            id: id.into(),
            content: content.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Message::Human { id, .. }
            | Message::Ai { id, .. }
            | Message::Tool { id, .. }
            | Message::System { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::Human { content, .. }
            | Message::Ai { content, .. }
            | Message::Tool { content, .. }
            | Message::System { content, .. } => content,
        }
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Human { .. } => "human",
            Message::Ai { .. } => "ai",
            Message::Tool { .. } => "tool",
            Message::System { .. } => "system",
        }
    }

    /// Tool calls carried by an `ai` message; empty for everything else
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// The call a `tool` message answers
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Whether clients should hide this message
    pub fn is_hidden(&self) -> bool {
        self.id().starts_with(DO_NOT_RENDER_ID_PREFIX)
    }
}

// ============================================================================
// Conversation state
// ============================================================================

/// Ordered history plus the model-invocation counter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// Incremented once per model invocation, never decremented
    pub turn_count: u32,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>, turn_count: u32) -> Self {
        Self {
            messages,
            turn_count,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool calls of the last message, if it is an `ai` message
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.last_message().map_or(&[], Message::tool_calls)
    }
}
