//! ReAct agent server
//!
//! Serves tool-calling conversations over HTTP: each conversation runs a
//! model/tools loop driven by a pure state machine, with optional human
//! approval of tool calls persisted across restarts.

mod api;
mod config;
mod db;
mod graph;
mod llm;
mod message;
mod runtime;
mod state_machine;
mod system_prompt;
mod tools;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use llm::{LlmConfig, ModelRegistry};
use runtime::RuntimeManager;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "react_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    // In-flight work cannot survive a restart; pending approvals can
    let reset = db.reset_transient_to_idle()?;
    if reset > 0 {
        tracing::info!(count = reset, "Reset interrupted conversations to idle");
    }

    let llm_config = LlmConfig::from_env();
    if !llm_config.has_credentials() {
        tracing::warn!("No LLM API keys configured. Set ANTHROPIC_API_KEY or OPENAI_API_KEY.");
    }
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    let tool_registry = Arc::new(ToolRegistry::new(config.tavily_api_key.clone()));
    tracing::info!(
        default_model = %config.default_model,
        tools = tool_registry.definitions().len(),
        "Agent initialized"
    );

    let runtime = Arc::new(RuntimeManager::new(db, llm_registry, tool_registry));
    let state = AppState::new(runtime, config.default_model.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Agent server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
