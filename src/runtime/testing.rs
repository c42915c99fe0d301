//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::llm::LlmError;
use crate::message::Message;
use crate::state_machine::ConvState;
use crate::tools::ToolOutput;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Model Client
// ============================================================================

/// Mock model client that returns queued replies
pub struct MockModelClient {
    replies: Mutex<VecDeque<Result<Message, LlmError>>>,
    model_id: String,
    /// Record of (system prompt, history) for every invocation
    pub requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl MockModelClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, message: Message) {
        self.replies.lock().unwrap().push_back(Ok(message));
    }

    /// Queue an error reply
    pub fn queue_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<(String, Vec<Message>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn invoke(&self, system_prompt: &str, messages: &[Message]) -> Result<Message, LlmError> {
        self.requests
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), messages.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Mock tool executor with predefined outputs
#[derive(Default)]
pub struct MockToolExecutor {
    outputs: HashMap<String, ToolOutput>,
    /// Record of tool executions
    pub executions: Mutex<Vec<(String, Value)>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool with a predefined output
    #[must_use]
    pub fn with_tool(mut self, name: impl Into<String>, output: ToolOutput) -> Self {
        self.outputs.insert(name.into(), output);
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, name: &str, input: Value, cancel: CancellationToken) -> Option<ToolOutput> {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), input));
        if cancel.is_cancelled() {
            return None;
        }
        Some(
            self.outputs
                .get(name)
                .cloned()
                .unwrap_or_else(|| ToolOutput::error(format!("Unknown tool: {name}"))),
        )
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

/// In-memory storage for testing
#[derive(Default)]
pub struct InMemoryStorage {
    messages: Mutex<HashMap<String, Vec<Message>>>,
    states: Mutex<HashMap<String, ConvState>>,
    turn_counts: Mutex<HashMap<String, u32>>,
    fail_next_append: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all messages for a conversation
    pub fn get_all_messages(&self, conv_id: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .get(conv_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Get current state for a conversation
    pub fn get_current_state(&self, conv_id: &str) -> Option<ConvState> {
        self.states.lock().unwrap().get(conv_id).cloned()
    }

    pub fn get_turn_count(&self, conv_id: &str) -> u32 {
        self.turn_counts
            .lock()
            .unwrap()
            .get(conv_id)
            .copied()
            .unwrap_or_default()
    }

    /// Make the next `add_messages` call fail
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Seed a conversation as if a previous process had left it
    pub fn seed(&self, conv_id: &str, messages: Vec<Message>, state: ConvState) {
        self.messages
            .lock()
            .unwrap()
            .insert(conv_id.to_string(), messages);
        self.states.lock().unwrap().insert(conv_id.to_string(), state);
    }
}

#[async_trait]
impl MessageStore for InMemoryStorage {
    async fn add_messages(&self, conv_id: &str, messages: &[Message]) -> Result<(), String> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        self.messages
            .lock()
            .unwrap()
            .entry(conv_id.to_string())
            .or_default()
            .extend(messages.iter().cloned());
        Ok(())
    }

    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, String> {
        Ok(self.get_all_messages(conv_id))
    }
}

#[async_trait]
impl StateStore for InMemoryStorage {
    async fn update_state(&self, conv_id: &str, state: &ConvState) -> Result<(), String> {
        self.states
            .lock()
            .unwrap()
            .insert(conv_id.to_string(), state.clone());
        Ok(())
    }

    async fn get_state(&self, conv_id: &str) -> Result<ConvState, String> {
        Ok(self.get_current_state(conv_id).unwrap_or_default())
    }

    async fn set_turn_count(&self, conv_id: &str, turn_count: u32) -> Result<(), String> {
        self.turn_counts
            .lock()
            .unwrap()
            .insert(conv_id.to_string(), turn_count);
        Ok(())
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

use crate::config::Configuration;
use crate::graph::{HumanResponse, ToolRouting};
use crate::message::SequentialIds;
use crate::runtime::{ConversationRuntime, SseEvent};
use crate::state_machine::{ConvContext, Event};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub conv_id: String,
    pub storage: Arc<InMemoryStorage>,
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
    pub model: Arc<MockModelClient>,
    pub tools: Arc<MockToolExecutor>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestRuntime {
    /// Create a simple test runtime with instant mocks
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder {
    conv_id: String,
    configuration: Configuration,
    turn_count: u32,
    storage: Arc<InMemoryStorage>,
    model: Option<MockModelClient>,
    tools: Option<MockToolExecutor>,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            conv_id: "test-conv".to_string(),
            configuration: Configuration::default(),
            turn_count: 0,
            storage: Arc::new(InMemoryStorage::new()),
            model: None,
            tools: None,
        }
    }

    pub fn model(mut self, model: MockModelClient) -> Self {
        self.model = Some(model);
        self
    }

    pub fn tools(mut self, tools: MockToolExecutor) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn routing(mut self, routing: ToolRouting) -> Self {
        self.configuration.tool_routing = routing;
        self
    }

    pub fn system_prompt(mut self, template: impl Into<String>) -> Self {
        self.configuration.system_prompt_template = template.into();
        self
    }

    pub fn turn_count(mut self, turn_count: u32) -> Self {
        self.turn_count = turn_count;
        self
    }

    pub fn storage(mut self, storage: Arc<InMemoryStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn build(self) -> TestRuntime {
        let model = Arc::new(self.model.unwrap_or_else(|| MockModelClient::new("test-model")));
        let tools = Arc::new(self.tools.unwrap_or_default());

        let context = ConvContext::new(&self.conv_id, self.configuration.tool_routing)
            .with_ids(Arc::new(SequentialIds::default()));
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

        let runtime = ConversationRuntime::new(
            context,
            self.configuration,
            self.turn_count,
            self.storage.clone(),
            model.clone(),
            tools.clone(),
            event_rx,
            event_tx.clone(),
            broadcast_tx,
        );

        let handle = tokio::spawn(async move {
            runtime.run().await;
        });

        TestRuntime {
            conv_id: self.conv_id,
            storage: self.storage,
            event_tx,
            broadcast_rx,
            model,
            tools,
            _runtime_handle: handle,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

const WAIT: Duration = Duration::from_secs(2);

impl TestRuntime {
    /// Send user message to the runtime
    pub async fn send_message(&self, text: &str) {
        self.event_tx
            .send(Event::UserMessage {
                text: text.to_string(),
            })
            .await
            .expect("Failed to send message");
    }

    /// Send a human decision for a pending interrupt
    pub async fn send_decision(&self, interrupt_id: &str, responses: Vec<HumanResponse>) {
        self.event_tx
            .send(Event::Decision {
                interrupt_id: interrupt_id.to_string(),
                responses,
            })
            .await
            .expect("Failed to send decision");
    }

    /// Wait for the next matching broadcast event
    async fn wait_for<F, R>(&mut self, timeout: Duration, mut matcher: F) -> Option<R>
    where
        F: FnMut(SseEvent) -> Option<R>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if let Ok(Ok(event)) =
                tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await
            {
                if let Some(found) = matcher(event) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Wait for `AgentDone`
    pub async fn wait_for_done(&mut self) -> bool {
        self.wait_for(WAIT, |e| matches!(e, SseEvent::AgentDone).then_some(()))
            .await
            .is_some()
    }

    /// Wait for a specific state type
    pub async fn wait_for_state(&mut self, expected_type: &str) -> bool {
        self.wait_for(WAIT, |e| match e {
            SseEvent::StateChange { state } => {
                (state.get("type").and_then(Value::as_str) == Some(expected_type)).then_some(())
            }
            _ => None,
        })
        .await
        .is_some()
    }

    /// Wait for an interrupt and return its `(id, value)`
    pub async fn wait_for_interrupt(&mut self) -> Option<(String, Value)> {
        self.wait_for(WAIT, |e| match e {
            SseEvent::Interrupt { interrupt } => {
                let id = interrupt.get("id")?.as_str()?.to_string();
                Some((id, interrupt.get("value").cloned().unwrap_or(Value::Null)))
            }
            _ => None,
        })
        .await
    }

    /// Wait for a broadcast error message
    pub async fn wait_for_error(&mut self) -> Option<String> {
        self.wait_for(WAIT, |e| match e {
            SseEvent::Error { message } => Some(message),
            _ => None,
        })
        .await
    }

    pub fn messages(&self) -> Vec<Message> {
        self.storage.get_all_messages(&self.conv_id)
    }

    pub fn state(&self) -> Option<ConvState> {
        self.storage.get_current_state(&self.conv_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        human_approval, ActionRequest, ApprovalStyle, MAX_TURNS_MESSAGE, SYNTHETIC_TOOL_RESPONSE,
    };
    use crate::message::{ConversationState, ToolCall, DO_NOT_RENDER_ID_PREFIX};
    use crate::state_machine::ErrorKind;
    use serde_json::json;

    fn adder_call(id: &str, a: i64, b: i64) -> ToolCall {
        ToolCall::new(id, "adder", json!({"a": a, "b": b}))
    }

    fn adder_tools() -> MockToolExecutor {
        MockToolExecutor::new().with_tool("adder", ToolOutput::success("The sum of 1 and 2 is 3"))
    }

    fn kinds(messages: &[Message]) -> Vec<&'static str> {
        messages.iter().map(Message::kind).collect()
    }

    #[tokio::test]
    async fn test_mock_model_client() {
        let mock = MockModelClient::new("test-model");
        mock.queue_reply(Message::ai("a1", "Hello!", vec![]));

        let reply = mock.invoke("system", &[Message::human("h1", "Hi")]).await.unwrap();
        assert_eq!(reply.content(), "Hello!");
        assert_eq!(mock.recorded_requests().len(), 1);

        let err = mock.invoke("system", &[]).await.unwrap_err();
        assert!(err.message.contains("No mock reply"));
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        let storage = InMemoryStorage::new();
        storage
            .add_messages("c", &[Message::human("h1", "hi")])
            .await
            .unwrap();
        storage.update_state("c", &ConvState::CallingModel).await.unwrap();
        storage.set_turn_count("c", 2).await.unwrap();

        assert_eq!(storage.get_messages("c").await.unwrap().len(), 1);
        assert_eq!(storage.get_state("c").await.unwrap(), ConvState::CallingModel);
        assert_eq!(storage.get_state("other").await.unwrap(), ConvState::Idle);
        assert_eq!(storage.get_turn_count("c"), 2);
    }

    #[tokio::test]
    async fn test_simple_text_response() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "Hello! How can I help?", vec![]));

        let mut rt = TestRuntime::builder()
            .model(model)
            .system_prompt("Time is {system_time}")
            .build();
        rt.send_message("Hello").await;

        assert!(rt.wait_for_done().await, "Should complete");
        assert_eq!(kinds(&rt.messages()), vec!["human", "ai"]);
        assert_eq!(rt.state(), Some(ConvState::Idle));
        assert_eq!(rt.storage.get_turn_count("test-conv"), 1);

        let requests = rt.model.recorded_requests();
        assert!(requests[0].0.starts_with("Time is "));
        assert!(!requests[0].0.contains("{system_time}"));
    }

    #[tokio::test]
    async fn test_tool_execution_cycle() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "", vec![adder_call("tc1", 1, 2)]));
        model.queue_reply(Message::ai("a2", "It is 3.", vec![]));

        let mut rt = TestRuntime::builder().model(model).tools(adder_tools()).build();
        rt.send_message("What is 1 + 2?").await;

        assert!(rt.wait_for_done().await);
        let messages = rt.messages();
        assert_eq!(kinds(&messages), vec!["human", "ai", "tool", "ai"]);
        assert_eq!(messages[2].tool_call_id(), Some("tc1"));
        assert_eq!(messages[2].content(), "The sum of 1 and 2 is 3");

        assert_eq!(
            rt.tools.recorded_executions(),
            vec![("adder".to_string(), json!({"a": 1, "b": 2}))]
        );
        // The second model call sees the tool result
        let requests = rt.model.recorded_requests();
        assert_eq!(requests[1].1.len(), 3);
    }

    #[tokio::test]
    async fn test_parallel_calls_all_answered() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai(
            "a1",
            "",
            vec![adder_call("tc1", 1, 2), adder_call("tc2", 3, 4)],
        ));
        model.queue_reply(Message::ai("a2", "Done.", vec![]));

        let mut rt = TestRuntime::builder().model(model).tools(adder_tools()).build();
        rt.send_message("Two sums please").await;

        assert!(rt.wait_for_done().await);
        let answered: Vec<_> = rt
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id().map(str::to_string))
            .collect();
        assert_eq!(answered, vec!["tc1", "tc2"]);
    }

    #[tokio::test]
    async fn test_turn_limit_appends_system_notice() {
        let model = MockModelClient::new("test-model");
        for i in 0..3 {
            model.queue_reply(Message::ai(
                format!("a{i}"),
                "",
                vec![adder_call(&format!("tc{i}"), 1, 2)],
            ));
        }

        let mut rt = TestRuntime::builder().model(model).tools(adder_tools()).build();
        rt.send_message("Keep adding").await;

        assert!(rt.wait_for_done().await);
        let messages = rt.messages();
        assert_eq!(
            kinds(&messages),
            vec!["human", "ai", "tool", "ai", "tool", "ai", "tool", "system"]
        );
        assert_eq!(messages[6].tool_call_id(), Some("tc2"));
        assert_eq!(messages[6].content(), SYNTHETIC_TOOL_RESPONSE);
        assert_eq!(messages[7].content(), MAX_TURNS_MESSAGE);
        // The third turn's call never runs
        assert_eq!(rt.tools.recorded_executions().len(), 2);
        assert_eq!(rt.storage.get_turn_count("test-conv"), 3);
    }

    #[tokio::test]
    async fn test_model_error_enters_error_state() {
        let model = MockModelClient::new("test-model");
        model.queue_error(LlmError::auth("Invalid API key"));
        model.queue_reply(Message::ai("a1", "Recovered", vec![]));

        let mut rt = TestRuntime::builder().model(model).build();
        rt.send_message("Hello").await;

        assert!(rt.wait_for_state("error").await);
        assert_eq!(
            rt.state(),
            Some(ConvState::Error {
                message: "Invalid API key".to_string(),
                error_kind: ErrorKind::Auth,
            })
        );

        // A new message recovers
        rt.send_message("Try again").await;
        assert!(rt.wait_for_done().await);
        assert_eq!(kinds(&rt.messages()), vec!["human", "human", "ai"]);
    }

    #[tokio::test]
    async fn test_failed_append_leaves_conversation_recoverable() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "Hello again", vec![]));

        let mut rt = TestRuntime::builder().model(model).build();
        rt.storage.fail_next_append();
        rt.send_message("Hello").await;

        assert_eq!(rt.wait_for_error().await.as_deref(), Some("disk full"));
        assert!(rt.wait_for_state("error").await);
        assert!(matches!(rt.state(), Some(ConvState::Error { .. })));
        assert!(rt.model.recorded_requests().is_empty());

        // The retry is accepted and reaches the model with only stored history
        rt.send_message("Hello?").await;
        assert!(rt.wait_for_done().await);
        let requests = rt.model.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(kinds(&requests[0].1), vec!["human"]);
        assert_eq!(requests[0].1[0].content(), "Hello?");
        assert_eq!(kinds(&rt.messages()), vec!["human", "ai"]);
    }

    #[tokio::test]
    async fn test_decision_without_interrupt_is_rejected() {
        let mut rt = TestRuntime::builder().build();
        rt.send_decision("nope", vec![HumanResponse::Accept]).await;
        let error = rt.wait_for_error().await.unwrap();
        assert!(error.contains("No decision is pending"));
    }

    #[tokio::test]
    async fn test_approval_accept_runs_tools() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "", vec![adder_call("tc1", 1, 2)]));
        model.queue_reply(Message::ai("a2", "3", vec![]));

        let mut rt = TestRuntime::builder()
            .model(model)
            .tools(adder_tools())
            .routing(ToolRouting::ApprovalActions)
            .build();
        rt.send_message("Add 1 and 2").await;

        let (interrupt_id, value) = rt.wait_for_interrupt().await.expect("interrupt");
        assert_eq!(value[0]["action_request"]["action"], "adder");
        assert_eq!(value[0]["config"]["allow_edit"], true);
        assert!(rt.tools.recorded_executions().is_empty());
        assert!(matches!(rt.state(), Some(ConvState::AwaitingApproval { .. })));

        rt.send_decision(&interrupt_id, vec![HumanResponse::Accept]).await;
        assert!(rt.wait_for_done().await);
        assert_eq!(rt.tools.recorded_executions().len(), 1);
        assert_eq!(kinds(&rt.messages()), vec!["human", "ai", "tool", "ai"]);
    }

    #[tokio::test]
    async fn test_approval_edit_replaces_args() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "", vec![adder_call("tc1", 1, 2)]));
        model.queue_reply(Message::ai("a2", "ok", vec![]));

        let mut rt = TestRuntime::builder()
            .model(model)
            .tools(adder_tools())
            .routing(ToolRouting::ApprovalActions)
            .build();
        rt.send_message("Add").await;

        let (interrupt_id, _) = rt.wait_for_interrupt().await.unwrap();
        let edited = ActionRequest {
            action: "adder".to_string(),
            args: json!({"a": 10, "b": 20}).as_object().cloned().unwrap(),
        };
        rt.send_decision(&interrupt_id, vec![HumanResponse::Edit(edited)]).await;

        assert!(rt.wait_for_done().await);
        assert_eq!(
            rt.tools.recorded_executions(),
            vec![("adder".to_string(), json!({"a": 10, "b": 20}))]
        );
    }

    #[tokio::test]
    async fn test_stale_decision_keeps_interrupt() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "", vec![adder_call("tc1", 1, 2)]));

        let mut rt = TestRuntime::builder()
            .model(model)
            .tools(adder_tools())
            .routing(ToolRouting::Approval)
            .build();
        rt.send_message("Add").await;
        rt.wait_for_interrupt().await.unwrap();

        rt.send_decision("not-the-interrupt", vec![HumanResponse::Accept]).await;
        assert!(rt.wait_for_error().await.is_some());
        assert!(matches!(rt.state(), Some(ConvState::AwaitingApproval { .. })));
        assert!(rt.tools.recorded_executions().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_calls_reconciled_on_next_message() {
        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a1", "", vec![adder_call("tc1", 1, 2)]));
        model.queue_reply(Message::ai("a2", "Fine.", vec![]));

        let mut rt = TestRuntime::builder()
            .model(model)
            .tools(adder_tools())
            .routing(ToolRouting::Approval)
            .build();
        rt.send_message("Add").await;
        let (interrupt_id, _) = rt.wait_for_interrupt().await.unwrap();

        rt.send_decision(&interrupt_id, vec![HumanResponse::Ignore]).await;
        assert!(rt.wait_for_done().await);
        assert!(rt.tools.recorded_executions().is_empty());

        rt.send_message("Never mind").await;
        assert!(rt.wait_for_done().await);

        let messages = rt.messages();
        assert_eq!(kinds(&messages), vec!["human", "ai", "tool", "human", "ai"]);
        assert!(messages[2].id().starts_with(DO_NOT_RENDER_ID_PREFIX));
        assert_eq!(messages[2].content(), SYNTHETIC_TOOL_RESPONSE);
        assert_eq!(messages[2].tool_call_id(), Some("tc1"));
    }

    #[tokio::test]
    async fn test_resumes_persisted_interrupt() {
        let call = adder_call("tc1", 1, 2);
        let history = vec![
            Message::human("h1", "Add"),
            Message::ai("a1", "", vec![call]),
        ];
        let interrupt = human_approval(
            &ConversationState::new(history.clone(), 1),
            ApprovalStyle::Informational,
            &SequentialIds::default(),
        );
        let interrupt_id = interrupt.id.clone();

        let storage = Arc::new(InMemoryStorage::new());
        storage.seed("test-conv", history, ConvState::AwaitingApproval { interrupt });

        let model = MockModelClient::new("test-model");
        model.queue_reply(Message::ai("a2", "3", vec![]));

        let mut rt = TestRuntime::builder()
            .storage(storage)
            .model(model)
            .tools(adder_tools())
            .routing(ToolRouting::Approval)
            .turn_count(1)
            .build();

        rt.send_decision(&interrupt_id, vec![HumanResponse::Accept]).await;
        assert!(rt.wait_for_done().await);
        assert_eq!(kinds(&rt.messages()), vec!["human", "ai", "tool", "ai"]);
        assert_eq!(rt.storage.get_turn_count("test-conv"), 2);
    }
}
