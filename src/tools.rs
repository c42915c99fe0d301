//! Tools the agent can call
//!
//! Tools are stateless singletons; per-call context arrives via `ToolContext`.

mod adder;
mod tavily;
mod weather;
mod wikipedia;

pub use adder::AdderTool;
pub use tavily::TavilySearchTool;
pub use weather::WeatherTool;
pub use wikipedia::WikipediaTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Context handed to a single tool invocation
#[derive(Clone)]
pub struct ToolContext {
    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// The conversation this tool is executing within
    pub conversation_id: String,

    /// Shared HTTP client for tools that reach external services
    pub http: reqwest::Client,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, conversation_id: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            cancel,
            conversation_id: conversation_id.into(),
            http,
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool with all context provided via `ToolContext`
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

/// Collection of tools available to conversations
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    http: reqwest::Client,
}

impl ToolRegistry {
    /// The standard tool set
    pub fn new(tavily_api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("react-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(TavilySearchTool::new(tavily_api_key)),
            Arc::new(WikipediaTool::default()),
            Arc::new(AdderTool),
            Arc::new(WeatherTool::default()),
        ];
        Self { tools, http }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        self.tools
            .iter()
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name.
    ///
    /// Returns `None` only when `cancel` fires before the tool finishes;
    /// unknown tools produce an error output.
    pub async fn execute(
        &self,
        conversation_id: &str,
        name: &str,
        input: Value,
        cancel: CancellationToken,
    ) -> Option<ToolOutput> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            tracing::warn!(conv_id = %conversation_id, tool = %name, "Unknown tool requested");
            return Some(ToolOutput::error(format!("Unknown tool: {name}")));
        };

        let ctx = ToolContext::new(cancel.clone(), conversation_id, self.http.clone());
        let start = std::time::Instant::now();

        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            output = tool.run(input, ctx) => Some(output),
        };

        tracing::info!(
            conv_id = %conversation_id,
            tool = %name,
            duration_ms = %start.elapsed().as_millis(),
            success = output.as_ref().map(|o| o.success),
            "Tool finished"
        );
        output
    }
}

/// Parse tool input into its typed form, mapping failures to an error output
pub(crate) fn parse_input<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, ToolOutput> {
    serde_json::from_value(input).map_err(|e| ToolOutput::error(format!("Invalid input: {e}")))
}
