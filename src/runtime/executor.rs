//! Conversation runtime executor

use super::traits::{ModelClient, Storage, ToolExecutor};
use super::SseEvent;

use crate::config::Configuration;
use crate::message::{ConversationState, Message, ToolCall};
use crate::state_machine::{transition, ConvContext, ConvState, Effect, ErrorKind, Event};
use crate::system_prompt;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Generic conversation runtime that can work with any storage, model, and tool implementations
pub struct ConversationRuntime<S, M, T>
where
    S: Storage + Clone + 'static,
    M: ModelClient + 'static,
    T: ToolExecutor + 'static,
{
    context: ConvContext,
    configuration: Configuration,
    state: ConvState,
    conversation: ConversationState,
    storage: S,
    model: Arc<M>,
    tool_executor: Arc<T>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    /// Cancelled when the runtime stops; in-flight tools observe a child token
    shutdown: CancellationToken,
}

impl<S, M, T> ConversationRuntime<S, M, T>
where
    S: Storage + Clone + 'static,
    M: ModelClient + 'static,
    T: ToolExecutor + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: ConvContext,
        configuration: Configuration,
        turn_count: u32,
        storage: S,
        model: M,
        tool_executor: T,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
    ) -> Self {
        Self {
            context,
            configuration,
            state: ConvState::Idle,
            conversation: ConversationState::new(Vec::new(), turn_count),
            storage,
            model: Arc::new(model),
            tool_executor: Arc::new(tool_executor),
            event_rx,
            event_tx,
            broadcast_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Load the persisted state and history
    async fn restore(&mut self) -> Result<(), String> {
        let conv_id = &self.context.conversation_id;
        self.state = self.storage.get_state(conv_id).await?;
        self.conversation.messages = self.storage.get_messages(conv_id).await?;
        tracing::debug!(
            conv_id = %conv_id,
            state = %self.state.name(),
            msg_count = self.conversation.messages.len(),
            turn_count = self.conversation.turn_count,
            "Restored conversation"
        );
        Ok(())
    }

    pub async fn run(mut self) {
        tracing::info!(conv_id = %self.context.conversation_id, "Starting conversation runtime");

        if let Err(e) = self.restore().await {
            tracing::error!(conv_id = %self.context.conversation_id, error = %e, "Failed to restore conversation");
            let _ = self.broadcast_tx.send(SseEvent::Error {
                message: format!("Failed to restore conversation: {e}"),
            });
            return;
        }

        // Process events in a loop - no recursion
        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event).await {
                tracing::error!(conv_id = %self.context.conversation_id, error = %e, "Error handling event");
            }
        }

        self.shutdown.cancel();
        tracing::info!(conv_id = %self.context.conversation_id, "Conversation runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), String> {
        let event_name = event.name();

        // Pure state transition
        let result = match transition(&self.state, &self.context, &self.conversation, event) {
            Ok(r) => r,
            Err(e) => {
                // Transition errors are user-facing (e.g., "agent is busy")
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    message: e.to_string(),
                });
                return Err(e.to_string());
            }
        };

        tracing::debug!(
            conv_id = %self.context.conversation_id,
            event = %event_name,
            from = %self.state.name(),
            to = %result.new_state.name(),
            "Transition"
        );
        self.state = result.new_state;

        for effect in result.effects {
            if let Err(e) = self.execute_effect(effect).await {
                let _ = self.broadcast_tx.send(SseEvent::Error { message: e.clone() });
                self.recover_from_failed_effect(&e).await;
                return Err(e);
            }
        }

        Ok(())
    }

    /// Leave the conversation in a state a new user message can recover from.
    ///
    /// Effects that spawn work always come last, so nothing is in flight here.
    /// The history is reloaded to match what actually reached storage.
    async fn recover_from_failed_effect(&mut self, error: &str) {
        let conv_id = self.context.conversation_id.clone();
        match self.storage.get_messages(&conv_id).await {
            Ok(messages) => self.conversation.messages = messages,
            Err(e) => tracing::warn!(conv_id = %conv_id, error = %e, "Failed to reload history"),
        }

        self.state = ConvState::Error {
            message: error.to_string(),
            error_kind: ErrorKind::Unknown,
        };
        if let Err(e) = self.storage.update_state(&conv_id, &self.state).await {
            tracing::error!(conv_id = %conv_id, error = %e, "Failed to persist error state");
        }
        let state = serde_json::to_value(&self.state).unwrap_or(Value::Null);
        let _ = self.broadcast_tx.send(SseEvent::StateChange { state });
    }

    /// Execute an effect
    async fn execute_effect(&mut self, effect: Effect) -> Result<(), String> {
        match effect {
            Effect::AppendMessages { messages } => {
                self.storage
                    .add_messages(&self.context.conversation_id, &messages)
                    .await?;

                for message in messages {
                    let msg_json = serde_json::to_value(&message).unwrap_or(Value::Null);
                    let _ = self
                        .broadcast_tx
                        .send(SseEvent::Message { message: msg_json });
                    self.conversation.messages.push(message);
                }
                Ok(())
            }

            Effect::SetTurnCount { turn_count } => {
                self.conversation.turn_count = turn_count;
                self.storage
                    .set_turn_count(&self.context.conversation_id, turn_count)
                    .await
            }

            Effect::PersistState => {
                self.storage
                    .update_state(&self.context.conversation_id, &self.state)
                    .await
            }

            Effect::RequestModel => {
                self.spawn_model_request();
                Ok(())
            }

            Effect::ExecuteTools { calls } => {
                self.spawn_tool_execution(calls);
                Ok(())
            }

            Effect::NotifyClient { event_type, data } => {
                let event = match event_type.as_str() {
                    "state_change" => Some(SseEvent::StateChange { state: data }),
                    "interrupt" => Some(SseEvent::Interrupt { interrupt: data }),
                    "agent_done" => Some(SseEvent::AgentDone),
                    other => {
                        tracing::warn!(event_type = %other, "Unknown client notification");
                        None
                    }
                };
                if let Some(event) = event {
                    let _ = self.broadcast_tx.send(event);
                }
                Ok(())
            }
        }
    }

    /// Invoke the model in the background; the outcome comes back as an event
    fn spawn_model_request(&self) {
        let model = self.model.clone();
        let event_tx = self.event_tx.clone();
        let conv_id = self.context.conversation_id.clone();
        let messages = self.conversation.messages.clone();
        let system_prompt =
            system_prompt::render(&self.configuration.system_prompt_template, chrono::Utc::now());

        tokio::spawn(async move {
            tracing::info!(conv_id = %conv_id, model = %model.model_id(), "Calling model (background)");

            let event = match model.invoke(&system_prompt, &messages).await {
                Ok(message) => Event::ModelResponse { message },
                Err(e) => {
                    tracing::warn!(conv_id = %conv_id, error = %e, kind = ?e.kind, "Model invocation failed");
                    Event::ModelError {
                        message: e.message,
                        error_kind: e.kind.into(),
                    }
                }
            };
            let _ = event_tx.send(event).await;
        });
    }

    /// Run all calls concurrently in the background and report one `ToolsComplete`
    fn spawn_tool_execution(&self, calls: Vec<ToolCall>) {
        let tool_executor = self.tool_executor.clone();
        let event_tx = self.event_tx.clone();
        let conv_id = self.context.conversation_id.clone();
        let ids = self.context.ids.clone();
        let cancel = self.shutdown.child_token();

        tokio::spawn(async move {
            tracing::info!(conv_id = %conv_id, count = calls.len(), "Executing tools (background)");

            let runs = calls.iter().map(|call| {
                let tool_executor = tool_executor.clone();
                let cancel = cancel.clone();
                async move {
                    let input = Value::Object(call.args.clone());
                    tool_executor.execute(&call.name, input, cancel).await
                }
            });
            let outputs = join_all(runs).await;

            // Cancelled calls stay unanswered; reconciliation covers them
            let responses: Vec<Message> = calls
                .iter()
                .zip(outputs)
                .filter_map(|(call, output)| {
                    output.map(|out| {
                        Message::tool(ids.next_id(), call.id(), call.name.clone(), out.output)
                    })
                })
                .collect();

            let _ = event_tx.send(Event::ToolsComplete { responses }).await;
        });
    }
}
