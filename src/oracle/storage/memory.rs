// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{ReadingRecord, SessionStore, TurnRecord};
use crate::adk::error::StorageError;
use crate::oracle::divination::Symbols;
use crate::oracle::workflow::state::{Tool, Turn};
use crate::oracle::workflow::trace::TraceEntry;

#[derive(Default)]
struct Tables {
    sessions: Vec<String>,
    messages: HashMap<String, Vec<Turn>>,
    readings: HashMap<String, Vec<ReadingRecord>>,
    traces: HashMap<String, Vec<Vec<TraceEntry>>>,
}

/// In-process session store
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sessions(&self) -> Vec<String> {
        self.tables.lock().await.sessions.clone()
    }

    pub async fn messages(&self, session_id: &str) -> Vec<Turn> {
        let tables = self.tables.lock().await;
        tables.messages.get(session_id).cloned().unwrap_or_default()
    }

    pub async fn readings(&self, session_id: &str) -> Vec<ReadingRecord> {
        let tables = self.tables.lock().await;
        tables.readings.get(session_id).cloned().unwrap_or_default()
    }

    pub async fn traces(&self, session_id: &str) -> Vec<Vec<TraceEntry>> {
        let tables = self.tables.lock().await;
        tables.traces.get(session_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn upsert_session(&self, session_id: &str) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        if !tables.sessions.iter().any(|s| s == session_id) {
            tables.sessions.push(session_id.to_string());
        }
        Ok(())
    }

    async fn add_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables
            .messages
            .entry(session_id.to_string())
            .or_default()
            .push(Turn {
                role: role.to_string(),
                content: content.to_string(),
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn add_reading(
        &self,
        session_id: &str,
        tool: Tool,
        symbols: &Symbols,
        verdict: &str,
        advice: &[String],
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables
            .readings
            .entry(session_id.to_string())
            .or_default()
            .push(ReadingRecord {
                tool,
                symbols: symbols.clone(),
                verdict: verdict.to_string(),
                advice: advice.to_vec(),
            });
        Ok(())
    }

    async fn add_trace(&self, session_id: &str, trace: &[TraceEntry]) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables
            .traces
            .entry(session_id.to_string())
            .or_default()
            .push(trace.to_vec());
        Ok(())
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, StorageError> {
        let tables = self.tables.lock().await;
        let all = tables.messages.get(session_id).map(Vec::as_slice).unwrap_or_default();
        Ok(all[all.len().saturating_sub(limit)..].to_vec())
    }

    async fn record_turn(&self, turn: &TurnRecord) -> Result<(), StorageError> {
        // Holding the lock for the whole turn keeps it atomic for readers
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let id = turn.session_id.clone();

        if !tables.sessions.contains(&id) {
            tables.sessions.push(id.clone());
        }
        let messages = tables.messages.entry(id.clone()).or_default();
        for (role, content) in [
            (super::ROLE_USER, &turn.question),
            (super::ROLE_ASSISTANT, &turn.reply),
        ] {
            messages.push(Turn {
                role: role.to_string(),
                content: content.clone(),
                created_at: now,
            });
        }
        if let Some(reading) = &turn.reading {
            tables
                .readings
                .entry(id.clone())
                .or_default()
                .push(reading.clone());
        }
        tables.traces.entry(id).or_default().push(turn.trace.clone());
        Ok(())
    }
}
