//! Database module
//!
//! Persists conversations (state, turn counter, configuration) and their
//! ordered message history in SQLite.

mod schema;

pub use schema::*;

use crate::config::Configuration;
use crate::message::Message;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

const CONVERSATION_COLUMNS: &str =
    "c.id, c.state, c.turn_count, c.configuration, c.state_updated_at, c.created_at, c.updated_at,
     (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) as message_count";

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ==================== Conversation Operations ====================

    /// Create a new conversation
    pub fn create_conversation(&self, id: &str, configuration: &Configuration) -> DbResult<Conversation> {
        let conn = self.conn()?;
        let now = Utc::now();
        let state_json = serde_json::to_string(&ConvState::Idle)?;
        let config_json = serde_json::to_string(configuration)?;

        conn.execute(
            "INSERT INTO conversations (id, state, turn_count, configuration, state_updated_at, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4, ?4, ?4)",
            params![id, state_json, config_json, now.to_rfc3339()],
        )?;

        Ok(Conversation {
            id: id.to_string(),
            state: ConvState::Idle,
            turn_count: 0,
            configuration: configuration.clone(),
            state_updated_at: now,
            created_at: now,
            updated_at: now,
            message_count: 0,
        })
    }

    /// Get conversation by ID
    pub fn get_conversation(&self, id: &str) -> DbResult<Conversation> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?1"
        ))?;

        stmt.query_row(params![id], parse_conversation_row)
            .optional()?
            .ok_or_else(|| DbError::ConversationNotFound(id.to_string()))
    }

    /// List conversations, most recently updated first
    pub fn list_conversations(&self) -> DbResult<Vec<Conversation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c ORDER BY c.updated_at DESC"
        ))?;

        let rows = stmt.query_map([], parse_conversation_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Update conversation state
    pub fn update_conversation_state(&self, id: &str, state: &ConvState) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let state_json = serde_json::to_string(state)?;

        let updated = conn.execute(
            "UPDATE conversations SET state = ?1, state_updated_at = ?2, updated_at = ?2 WHERE id = ?3",
            params![state_json, now, id],
        )?;

        if updated == 0 {
            return Err(DbError::ConversationNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Record the model-invocation counter
    pub fn set_turn_count(&self, id: &str, turn_count: u32) -> DbResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE conversations SET turn_count = ?1, updated_at = ?2 WHERE id = ?3",
            params![turn_count, Utc::now().to_rfc3339(), id],
        )?;

        if updated == 0 {
            return Err(DbError::ConversationNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Reset conversations left mid-flight by a previous process.
    ///
    /// `calling_model` and `executing_tools` become `idle`; suspended
    /// `awaiting_approval` conversations keep their interrupt.
    pub fn reset_transient_to_idle(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let idle_state = serde_json::to_string(&ConvState::Idle)?;

        let reset = conn.execute(
            "UPDATE conversations SET state = ?1, state_updated_at = ?2, updated_at = ?2
             WHERE json_extract(state, '$.type') IN ('calling_model', 'executing_tools')",
            params![idle_state, now],
        )?;
        Ok(reset)
    }

    // ==================== Message Operations ====================

    /// Append messages to a conversation, in order
    pub fn add_messages(&self, conversation_id: &str, messages: &[Message]) -> DbResult<Vec<StoredMessage>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
            params![conversation_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::ConversationNotFound(conversation_id.to_string()));
        }

        let mut sequence_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;

        let mut stored = Vec::with_capacity(messages.len());
        for message in messages {
            sequence_id += 1;
            tx.execute(
                "INSERT INTO messages (conversation_id, sequence_id, message_id, message_type, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    conversation_id,
                    sequence_id,
                    message.id(),
                    message.kind(),
                    serde_json::to_string(message)?,
                    now.to_rfc3339(),
                ],
            )?;
            stored.push(StoredMessage {
                conversation_id: conversation_id.to_string(),
                sequence_id,
                message: message.clone(),
                created_at: now,
            });
        }

        tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), conversation_id],
        )?;
        tx.commit()?;
        Ok(stored)
    }

    /// Get messages for a conversation in order
    pub fn get_messages(&self, conversation_id: &str) -> DbResult<Vec<StoredMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT conversation_id, sequence_id, message, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (conversation_id, sequence_id, message_json, created_at) = row?;
            messages.push(StoredMessage {
                conversation_id,
                sequence_id,
                message: serde_json::from_str(&message_json)?,
                created_at: parse_datetime(&created_at),
            });
        }
        Ok(messages)
    }
}

fn parse_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let state_json: String = row.get(1)?;
    let config_json: String = row.get(3)?;
    Ok(Conversation {
        id: row.get(0)?,
        state: serde_json::from_str(&state_json).unwrap_or_default(),
        turn_count: row.get(2)?,
        configuration: serde_json::from_str(&config_json).unwrap_or_default(),
        state_updated_at: parse_datetime(&row.get::<_, String>(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
        message_count: row.get(7)?,
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
