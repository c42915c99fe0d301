//! Wikipedia tool - MediaWiki search with page extracts

use super::{parse_input, Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const TOP_K_RESULTS: usize = 3;
const MAX_DOC_CONTENT_LENGTH: usize = 4000;
const NO_RESULTS: &str = "No good Wikipedia Search Result was found";

pub struct WikipediaTool {
    api_url: String,
    top_k: usize,
    max_doc_chars: usize,
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self {
            api_url: WIKIPEDIA_API_URL.to_string(),
            top_k: TOP_K_RESULTS,
            max_doc_chars: MAX_DOC_CONTENT_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WikipediaInput {
    #[serde(alias = "input")]
    query: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: ExtractQuery,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    pages: std::collections::HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: String,
}

/// A fetched page ready for formatting
struct Page {
    title: String,
    summary: String,
}

impl WikipediaTool {
    async fn search(&self, ctx: &ToolContext, query: &str) -> Result<Vec<String>, reqwest::Error> {
        let limit = self.top_k.to_string();
        let response: SearchResponse = ctx
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.query.search.into_iter().map(|hit| hit.title).collect())
    }

    async fn extract(&self, ctx: &ToolContext, title: &str) -> Result<String, reqwest::Error> {
        let response: ExtractResponse = ctx
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("titles", title),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response
            .query
            .pages
            .into_values()
            .next()
            .map(|p| p.extract)
            .unwrap_or_default())
    }
}

fn format_pages(pages: &[Page], max_chars: usize) -> String {
    if pages.is_empty() {
        return NO_RESULTS.to_string();
    }
    let joined = pages
        .iter()
        .map(|p| format!("Page: {}\nSummary: {}", p.title, p.summary))
        .collect::<Vec<_>>()
        .join("\n\n");
    joined.chars().take(max_chars).collect()
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &'static str {
        "wikipedia-api"
    }

    fn description(&self) -> String {
        "A tool for interacting with and fetching data from the Wikipedia API.".to_string()
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
        let input: WikipediaInput = match parse_input(input) {
            Ok(i) => i,
            Err(e) => return e,
        };

        let titles = match self.search(&ctx, &input.query).await {
            Ok(t) => t,
            Err(e) => return ToolOutput::error(format!("Wikipedia search failed: {e}")),
        };

        let mut pages = Vec::with_capacity(titles.len());
        for title in titles {
            if ctx.cancel.is_cancelled() {
                break;
            }
            match self.extract(&ctx, &title).await {
                Ok(summary) if !summary.is_empty() => pages.push(Page { title, summary }),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(conv_id = %ctx.conversation_id, title = %title, error = %e, "Wikipedia extract failed");
                }
            }
        }

        ToolOutput::success(format_pages(&pages, self.max_doc_chars))
    }
}
