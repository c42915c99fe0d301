//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::{LlmError, LlmRequest, ToolDefinition};
use crate::message::Message;
use crate::state_machine::ConvState;
use crate::tools::ToolOutput;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Storage for conversation messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append messages to the conversation, preserving order
    async fn add_messages(&self, conv_id: &str, messages: &[Message]) -> Result<(), String>;

    /// Get all messages for a conversation
    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, String>;
}

/// Storage for conversation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Update the conversation state (full state as JSON)
    async fn update_state(&self, conv_id: &str, state: &ConvState) -> Result<(), String>;

    /// Get the current conversation state
    async fn get_state(&self, conv_id: &str) -> Result<ConvState, String>;

    /// Record the model-invocation counter
    async fn set_turn_count(&self, conv_id: &str, turn_count: u32) -> Result<(), String>;
}

/// Chat model with its tools already bound
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Produce the next `ai` message for the history
    async fn invoke(&self, system_prompt: &str, messages: &[Message]) -> Result<Message, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name; `None` when cancelled before completion
    async fn execute(&self, name: &str, input: Value, cancel: CancellationToken) -> Option<ToolOutput>;
}

/// Combined storage trait for convenience
pub trait Storage: MessageStore + StateStore {}
impl<T: MessageStore + StateStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: MessageStore + ?Sized> MessageStore for Arc<T> {
    async fn add_messages(&self, conv_id: &str, messages: &[Message]) -> Result<(), String> {
        (**self).add_messages(conv_id, messages).await
    }

    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, String> {
        (**self).get_messages(conv_id).await
    }
}

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn update_state(&self, conv_id: &str, state: &ConvState) -> Result<(), String> {
        (**self).update_state(conv_id, state).await
    }

    async fn get_state(&self, conv_id: &str) -> Result<ConvState, String> {
        (**self).get_state(conv_id).await
    }

    async fn set_turn_count(&self, conv_id: &str, turn_count: u32) -> Result<(), String> {
        (**self).set_turn_count(conv_id, turn_count).await
    }
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn invoke(&self, system_prompt: &str, messages: &[Message]) -> Result<Message, LlmError> {
        (**self).invoke(system_prompt, messages).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, name: &str, input: Value, cancel: CancellationToken) -> Option<ToolOutput> {
        (**self).execute(name, input, cancel).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;
use crate::llm::ModelRegistry;
use crate::tools::ToolRegistry;

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for DatabaseStorage {
    async fn add_messages(&self, conv_id: &str, messages: &[Message]) -> Result<(), String> {
        self.db
            .add_messages(conv_id, messages)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, String> {
        self.db
            .get_messages(conv_id)
            .map(|stored| stored.into_iter().map(|m| m.message).collect())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl StateStore for DatabaseStorage {
    async fn update_state(&self, conv_id: &str, state: &ConvState) -> Result<(), String> {
        self.db
            .update_conversation_state(conv_id, state)
            .map_err(|e| e.to_string())
    }

    async fn get_state(&self, conv_id: &str) -> Result<ConvState, String> {
        let conv = self.db.get_conversation(conv_id).map_err(|e| e.to_string())?;
        Ok(conv.state)
    }

    async fn set_turn_count(&self, conv_id: &str, turn_count: u32) -> Result<(), String> {
        self.db
            .set_turn_count(conv_id, turn_count)
            .map_err(|e| e.to_string())
    }
}

const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Adapter binding a registry model spec and tool definitions into a `ModelClient`
pub struct RegistryModelClient {
    registry: Arc<ModelRegistry>,
    model_spec: String,
    tools: Vec<ToolDefinition>,
}

impl RegistryModelClient {
    pub fn new(registry: Arc<ModelRegistry>, model_spec: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            registry,
            model_spec: model_spec.into(),
            tools,
        }
    }
}

#[async_trait]
impl ModelClient for RegistryModelClient {
    async fn invoke(&self, system_prompt: &str, messages: &[Message]) -> Result<Message, LlmError> {
        // Resolution failures (unknown provider, missing key) surface as model errors
        let llm = self.registry.load(&self.model_spec)?;
        let request = LlmRequest {
            system: system_prompt.to_string(),
            messages: messages.to_vec(),
            tools: self.tools.clone(),
            max_tokens: Some(MAX_OUTPUT_TOKENS),
        };
        let response = llm.complete(&request).await?;
        Ok(response.message)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}

/// Adapter to use ToolRegistry as ToolExecutor for one conversation
pub struct ToolRegistryExecutor {
    registry: Arc<ToolRegistry>,
    conversation_id: String,
}

impl ToolRegistryExecutor {
    pub fn new(registry: Arc<ToolRegistry>, conversation_id: impl Into<String>) -> Self {
        Self {
            registry,
            conversation_id: conversation_id.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistryExecutor {
    async fn execute(&self, name: &str, input: Value, cancel: CancellationToken) -> Option<ToolOutput> {
        self.registry
            .execute(&self.conversation_id, name, input, cancel)
            .await
    }
}
