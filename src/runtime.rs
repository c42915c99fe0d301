//! Runtime for executing conversations
//!
//! One task per active conversation consumes that conversation's event
//! channel and applies transitions strictly in order.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::db::Database;
use crate::llm::ModelRegistry;
use crate::state_machine::{ConvContext, Event};
use crate::tools::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime =
    ConversationRuntime<DatabaseStorage, RegistryModelClient, ToolRegistryExecutor>;

/// Manager for all conversation runtimes
pub struct RuntimeManager {
    db: Database,
    llm_registry: Arc<ModelRegistry>,
    tool_registry: Arc<ToolRegistry>,
    runtimes: RwLock<HashMap<String, ConversationHandle>>,
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        conversation: serde_json::Value,
        messages: Vec<serde_json::Value>,
        agent_working: bool,
        /// Pending approval request, if the conversation is suspended
        interrupt: Option<serde_json::Value>,
    },
    Message {
        message: serde_json::Value,
    },
    StateChange {
        /// Full state as JSON object (e.g., `{"type":"executing_tools","calls":[...]}`)
        state: serde_json::Value,
    },
    Interrupt {
        interrupt: serde_json::Value,
    },
    AgentDone,
    Error {
        message: String,
    },
}

impl RuntimeManager {
    pub fn new(db: Database, llm_registry: Arc<ModelRegistry>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            db,
            llm_registry,
            tool_registry,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create a runtime for a conversation
    pub async fn get_or_create(&self, conversation_id: &str) -> Result<ConversationHandle, String> {
        // Check if already running
        if let Some(handle) = self.runtimes.read().await.get(conversation_id) {
            return Ok(handle.clone());
        }

        let mut runtimes = self.runtimes.write().await;
        // Another caller may have started it while we waited for the lock
        if let Some(handle) = runtimes.get(conversation_id) {
            return Ok(handle.clone());
        }

        let conv = self
            .db
            .get_conversation(conversation_id)
            .map_err(|e| e.to_string())?;

        let context = ConvContext::new(&conv.id, conv.configuration.tool_routing);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);

        // Create production adapters
        let storage = DatabaseStorage::new(self.db.clone());
        let model = RegistryModelClient::new(
            self.llm_registry.clone(),
            conv.configuration.model.clone(),
            self.tool_registry.definitions(),
        );
        let tool_executor = ToolRegistryExecutor::new(self.tool_registry.clone(), &conv.id);

        let runtime: ProductionRuntime = ConversationRuntime::new(
            context,
            conv.configuration,
            conv.turn_count,
            storage,
            model,
            tool_executor,
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
        );

        // Start runtime in background
        let conv_id = conversation_id.to_string();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(conv_id = %conv_id, "Conversation runtime finished");
        });

        let handle = ConversationHandle {
            event_tx,
            broadcast_tx,
        };
        runtimes.insert(conversation_id.to_string(), handle.clone());

        Ok(handle)
    }

    /// Send an event to a conversation
    pub async fn send_event(&self, conversation_id: &str, event: Event) -> Result<(), String> {
        let handle = self.get_or_create(conversation_id).await?;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Subscribe to conversation updates
    pub async fn subscribe(
        &self,
        conversation_id: &str,
    ) -> Result<broadcast::Receiver<SseEvent>, String> {
        let handle = self.get_or_create(conversation_id).await?;
        Ok(handle.broadcast_tx.subscribe())
    }

    /// Get the database handle
    pub fn db(&self) -> &Database {
        &self.db
    }
}
