//! Events that can occur in a conversation

use super::state::ErrorKind;
use crate::graph::HumanResponse;
use crate::message::Message;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    Decision {
        interrupt_id: String,
        responses: Vec<HumanResponse>,
    },

    // Model events
    ModelResponse {
        message: Message,
    },
    ModelError {
        message: String,
        error_kind: ErrorKind,
    },

    // Tool events
    ToolsComplete {
        responses: Vec<Message>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::Decision { .. } => "decision",
            Event::ModelResponse { .. } => "model_response",
            Event::ModelError { .. } => "model_error",
            Event::ToolsComplete { .. } => "tools_complete",
        }
    }
}
