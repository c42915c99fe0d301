//! Conversation state types

use crate::graph::{PendingInterrupt, ToolRouting};
use crate::llm::LlmErrorKind;
use crate::message::{IdGenerator, ToolCall, UuidGenerator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error classification for UI display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Network,
    ServerError,
    InvalidRequest,
    Unknown,
}

impl From<LlmErrorKind> for ErrorKind {
    fn from(kind: LlmErrorKind) -> Self {
        match kind {
            LlmErrorKind::Auth => ErrorKind::Auth,
            LlmErrorKind::RateLimit => ErrorKind::RateLimit,
            LlmErrorKind::Network => ErrorKind::Network,
            LlmErrorKind::ServerError => ErrorKind::ServerError,
            LlmErrorKind::InvalidRequest => ErrorKind::InvalidRequest,
            LlmErrorKind::Unknown => ErrorKind::Unknown,
        }
    }
}

/// Conversation state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input, no pending operations
    #[default]
    Idle,

    /// Model request in flight
    CallingModel,

    /// Running the calls of the last model turn
    ExecutingTools { calls: Vec<ToolCall> },

    /// Suspended until a human decision names this interrupt.
    /// Survives restarts.
    AwaitingApproval { interrupt: PendingInterrupt },

    /// Model call failed - UI displays this state directly
    Error {
        message: String,
        error_kind: ErrorKind,
    },
}

impl ConvState {
    /// Check if agent is currently working
    pub fn is_working(&self) -> bool {
        matches!(self, ConvState::CallingModel | ConvState::ExecutingTools { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::CallingModel => "calling_model",
            ConvState::ExecutingTools { .. } => "executing_tools",
            ConvState::AwaitingApproval { .. } => "awaiting_approval",
            ConvState::Error { .. } => "error",
        }
    }

    pub fn pending_interrupt(&self) -> Option<&PendingInterrupt> {
        match self {
            ConvState::AwaitingApproval { interrupt } => Some(interrupt),
            _ => None,
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Clone)]
pub struct ConvContext {
    pub conversation_id: String,
    pub tool_routing: ToolRouting,
    /// Source of ids for messages and interrupts created by transitions
    pub ids: Arc<dyn IdGenerator>,
}

impl ConvContext {
    pub fn new(conversation_id: impl Into<String>, tool_routing: ToolRouting) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            tool_routing,
            ids: Arc::new(UuidGenerator),
        }
    }

    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}
