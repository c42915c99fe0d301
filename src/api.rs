//! HTTP API for the agent server

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::RuntimeManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    /// Model used when a conversation's configuration names none
    pub default_model: String,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>, default_model: impl Into<String>) -> Self {
        Self {
            runtime,
            default_model: default_model.into(),
        }
    }
}
