//! Effects produced by state transitions

use super::state::ConvState;
use crate::graph::PendingInterrupt;
use crate::message::{Message, ToolCall};
use serde_json::Value;

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append messages to the history and persist them
    AppendMessages { messages: Vec<Message> },

    /// Record the model-invocation counter
    SetTurnCount { turn_count: u32 },

    /// Persist the new state
    PersistState,

    /// Invoke the model with the current history
    RequestModel,

    /// Run tool calls (concurrently) and report a `ToolsComplete` event
    ExecuteTools { calls: Vec<ToolCall> },

    /// Notify connected clients
    NotifyClient { event_type: String, data: Value },
}

impl Effect {
    pub fn append(messages: Vec<Message>) -> Self {
        Effect::AppendMessages { messages }
    }

    pub fn notify_state_change(state: &ConvState) -> Self {
        Effect::NotifyClient {
            event_type: "state_change".to_string(),
            data: serde_json::to_value(state).unwrap_or(Value::Null),
        }
    }

    pub fn notify_interrupt(interrupt: &PendingInterrupt) -> Self {
        Effect::NotifyClient {
            event_type: "interrupt".to_string(),
            data: interrupt.client_view(),
        }
    }

    pub fn notify_agent_done() -> Self {
        Effect::NotifyClient {
            event_type: "agent_done".to_string(),
            data: Value::Null,
        }
    }
}
