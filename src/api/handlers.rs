//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ConversationListResponse, ConversationResponse, ConversationWithMessagesResponse,
    CreateConversationRequest, ErrorResponse, QueuedResponse, ResumeRequest, SendMessageRequest,
};
use super::AppState;
use crate::config::{ConfigError, Configuration};
use crate::db::{Conversation, DbError};
use crate::graph::apply_decision;
use crate::message::UuidGenerator;
use crate::runtime::SseEvent;
use crate::state_machine::Event;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use thiserror::Error;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/stream", get(stream_conversation))
        .route("/api/conversations/:id/messages", post(send_message))
        .route("/api/conversations/:id/resume", post(resume_conversation))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state.runtime.db().list_conversations()?;

    Ok(Json(ConversationListResponse {
        conversations: conversations.iter().map(to_json).collect(),
    }))
}

async fn create_conversation(
    State(state): State<AppState>,
    body: Option<Json<CreateConversationRequest>>,
) -> Result<Json<ConversationResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let configuration =
        Configuration::from_configurable_with_model(req.configurable.as_ref(), &state.default_model)?;

    let id = uuid::Uuid::new_v4().to_string();
    let conversation = state.runtime.db().create_conversation(&id, &configuration)?;

    tracing::info!(
        conv_id = %id,
        model = %configuration.model,
        routing = ?configuration.tool_routing,
        "Created conversation"
    );

    Ok(Json(ConversationResponse {
        conversation: to_json(&conversation),
    }))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationWithMessagesResponse>, AppError> {
    let conversation = state.runtime.db().get_conversation(&id)?;
    let messages = state.runtime.db().get_messages(&id)?;

    Ok(Json(ConversationWithMessagesResponse {
        messages: messages.iter().map(|m| to_json(&m.message)).collect(),
        agent_working: conversation.is_agent_working(),
        interrupt: conversation.state.pending_interrupt().map(|i| i.client_view()),
        conversation: to_json(&conversation),
    }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = state.runtime.db().get_conversation(&id)?;

    // Subscribe before snapshotting so nothing falls between the two
    let broadcast_rx = state
        .runtime
        .subscribe(&id)
        .await
        .map_err(AppError::Internal)?;

    let messages = state.runtime.db().get_messages(&id)?;

    let init_event = SseEvent::Init {
        messages: messages.iter().map(|m| to_json(&m.message)).collect(),
        agent_working: conversation.is_agent_working(),
        interrupt: conversation.state.pending_interrupt().map(|i| i.client_view()),
        conversation: to_json(&conversation),
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let conversation = state.runtime.db().get_conversation(&id)?;
    if conversation.is_agent_working() {
        return Err(AppError::Conflict(
            "Agent is busy, cannot accept message".to_string(),
        ));
    }

    state
        .runtime
        .send_event(&id, Event::UserMessage { text: req.text })
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn resume_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResumeRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let conversation = state.runtime.db().get_conversation(&id)?;
    check_resumable(&conversation, &req)?;

    state
        .runtime
        .send_event(
            &id,
            Event::Decision {
                interrupt_id: req.interrupt_id,
                responses: req.responses,
            },
        )
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

/// Reject decisions that cannot apply to the persisted interrupt
fn check_resumable(conversation: &Conversation, req: &ResumeRequest) -> Result<(), AppError> {
    let interrupt = conversation.state.pending_interrupt().ok_or_else(|| {
        AppError::Conflict("No decision is pending for this conversation".to_string())
    })?;

    if interrupt.id != req.interrupt_id {
        return Err(AppError::Conflict(format!(
            "Decision targets interrupt {}, but {} is pending",
            req.interrupt_id, interrupt.id
        )));
    }
    if req.responses.is_empty() {
        return Err(AppError::BadRequest(
            "At least one response is required".to_string(),
        ));
    }
    // Dry run against the stored interrupt; the runtime applies it for real
    apply_decision(interrupt, &req.responses, &UuidGenerator)
        .map_err(|e| AppError::BadRequest(format!("Invalid decision: {e}")))?;
    Ok(())
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("react-agent ", env!("CARGO_PKG_VERSION"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConversationNotFound(_) => AppError::NotFound(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
