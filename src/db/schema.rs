//! Database schema and record types

use crate::config::Configuration;
use crate::message::Message;
pub use crate::state_machine::state::ConvState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    state TEXT NOT NULL DEFAULT '{"type":"idle"}',
    turn_count INTEGER NOT NULL DEFAULT 0,
    configuration TEXT NOT NULL,
    state_updated_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at DESC);

CREATE TABLE IF NOT EXISTS messages (
    conversation_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    message_id TEXT NOT NULL,
    message_type TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (conversation_id, sequence_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_message_id ON messages(message_id);
"#;

/// Conversation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub state: ConvState,
    pub turn_count: u32,
    pub configuration: Configuration,
    pub state_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: i64,
}

impl Conversation {
    /// Check if the agent is currently working
    pub fn is_agent_working(&self) -> bool {
        self.state.is_working()
    }
}

/// Stored message with its position in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub sequence_id: i64,
    pub message: Message,
    pub created_at: DateTime<Utc>,
}
