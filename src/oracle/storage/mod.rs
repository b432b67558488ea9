// SPDX-License-Identifier: MIT

//! Session persistence
//!
//! [`SessionStore`] is the seam the persist and narration stages talk to.
//! [`SqliteStore`] is the durable implementation; [`MemoryStore`] keeps
//! everything in process for tests and throwaway CLI runs.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::adk::error::StorageError;
use crate::oracle::divination::Symbols;
use crate::oracle::workflow::state::{Tool, Turn};
use crate::oracle::workflow::trace::TraceEntry;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Reading half of a persisted turn
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRecord {
    pub tool: Tool,
    pub symbols: Symbols,
    pub verdict: String,
    pub advice: Vec<String>,
}

/// Every write belonging to one completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRecord {
    pub session_id: String,
    pub question: String,
    pub reply: String,
    pub reading: Option<ReadingRecord>,
    /// Normalized trace
    pub trace: Vec<TraceEntry>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the session, or bump its last-active time
    async fn upsert_session(&self, session_id: &str) -> Result<(), StorageError>;

    async fn add_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), StorageError>;

    async fn add_reading(
        &self,
        session_id: &str,
        tool: Tool,
        symbols: &Symbols,
        verdict: &str,
        advice: &[String],
    ) -> Result<(), StorageError>;

    async fn add_trace(&self, session_id: &str, trace: &[TraceEntry]) -> Result<(), StorageError>;

    /// Most recent `limit` messages of the session, oldest first
    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, StorageError>;

    /// Write a whole turn. Implementations that can should make this atomic.
    async fn record_turn(&self, turn: &TurnRecord) -> Result<(), StorageError> {
        self.upsert_session(&turn.session_id).await?;
        self.add_message(&turn.session_id, ROLE_USER, &turn.question)
            .await?;
        self.add_message(&turn.session_id, ROLE_ASSISTANT, &turn.reply)
            .await?;
        if let Some(reading) = &turn.reading {
            self.add_reading(
                &turn.session_id,
                reading.tool,
                &reading.symbols,
                &reading.verdict,
                &reading.advice,
            )
            .await?;
        }
        self.add_trace(&turn.session_id, &turn.trace).await
    }
}
