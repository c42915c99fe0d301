//! API request and response types

use crate::graph::HumanResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to create a new conversation
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Per-conversation settings (`systemPromptTemplate`, `model`, `toolRouting`)
    #[serde(default)]
    pub configurable: Option<Value>,
}

/// Request to send a user message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Decision for a pending interrupt
#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub interrupt_id: String,
    pub responses: Vec<HumanResponse>,
}

/// Response with a list of conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Value>,
}

/// Response with a single conversation
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Value,
}

/// Response with conversation and messages
#[derive(Debug, Serialize)]
pub struct ConversationWithMessagesResponse {
    pub conversation: Value,
    pub messages: Vec<Value>,
    pub agent_working: bool,
    /// `{id, value}` of the pending approval request
    pub interrupt: Option<Value>,
}

/// Response for queued events
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
