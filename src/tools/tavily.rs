//! Tavily web search tool

use super::{parse_input, Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 3;

pub struct TavilySearchTool {
    api_key: Option<String>,
    api_url: String,
}

impl TavilySearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            api_url: TAVILY_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    #[serde(alias = "input")]
    query: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SearchResult {
    title: String,
    url: String,
    content: String,
    #[serde(default)]
    score: f64,
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &'static str {
        "tavily_search_results_json"
    }

    fn description(&self) -> String {
        "A search engine optimized for comprehensive, accurate, and trusted results. \
         Useful for when you need to answer questions about current events. \
         Input should be a search query."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {"type": "string", "description": "Search query"}
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: SearchInput = match parse_input(input) {
            Ok(i) => i,
            Err(e) => return e,
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return ToolOutput::error("TAVILY_API_KEY is not set");
        };

        let request = SearchRequest {
            api_key,
            query: &input.query,
            max_results: MAX_RESULTS,
        };

        let response = match ctx.http.post(&self.api_url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => return ToolOutput::error(format!("Search request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(conv_id = %ctx.conversation_id, status = %status, "Tavily search failed");
            return ToolOutput::error(format!("Search failed ({status}): {body}"));
        }

        match response.json::<SearchResponse>().await {
            Ok(parsed) => ToolOutput::success(format_results(&parsed.results)),
            Err(e) => ToolOutput::error(format!("Failed to parse search results: {e}")),
        }
    }
}

fn format_results(results: &[SearchResult]) -> String {
    serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string())
}
