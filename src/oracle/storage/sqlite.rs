// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{SessionStore, TurnRecord, ROLE_ASSISTANT, ROLE_USER};
use crate::adk::error::StorageError;
use crate::oracle::divination::Symbols;
use crate::oracle::workflow::state::{Tool, Turn};
use crate::oracle::workflow::trace::TraceEntry;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    last_active_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    tool TEXT NOT NULL,
    symbols TEXT NOT NULL,
    verdict TEXT NOT NULL,
    advice TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_traces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    trace TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_session ON messages (session_id, id);
";

/// SQLite-backed session store
///
/// One connection guarded by a mutex; every statement runs on the blocking
/// pool, so writes from concurrent requests are serialized.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StorageError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::with_connection(conn, path)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, path: PathBuf) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        log::info!("Opened session database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut guard)
        })
        .await?
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn upsert_session(conn: &Connection, session_id: &str, at: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO sessions (id, created_at, last_active_at)
         VALUES (?1, ?2, ?2)
         ON CONFLICT(id) DO UPDATE SET last_active_at = excluded.last_active_at",
        params![session_id, at],
    )?;
    Ok(())
}

fn insert_message(
    conn: &Connection,
    session_id: &str,
    role: &str,
    content: &str,
    at: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO messages (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![session_id, role, content, at],
    )?;
    Ok(())
}

fn insert_reading(
    conn: &Connection,
    session_id: &str,
    tool: Tool,
    symbols: &str,
    verdict: &str,
    advice: &str,
    at: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO readings (session_id, tool, symbols, verdict, advice, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![session_id, tool.as_str(), symbols, verdict, advice, at],
    )?;
    Ok(())
}

fn insert_trace(
    conn: &Connection,
    session_id: &str,
    trace: &str,
    at: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO agent_traces (session_id, trace, created_at) VALUES (?1, ?2, ?3)",
        params![session_id, trace, at],
    )?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn upsert_session(&self, session_id: &str) -> Result<(), StorageError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| upsert_session(conn, &session_id, &now()))
            .await
    }

    async fn add_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), StorageError> {
        let (session_id, role, content) =
            (session_id.to_string(), role.to_string(), content.to_string());
        self.with_conn(move |conn| insert_message(conn, &session_id, &role, &content, &now()))
            .await
    }

    async fn add_reading(
        &self,
        session_id: &str,
        tool: Tool,
        symbols: &Symbols,
        verdict: &str,
        advice: &[String],
    ) -> Result<(), StorageError> {
        let symbols = serde_json::to_string(symbols)?;
        let advice = serde_json::to_string(advice)?;
        let (session_id, verdict) = (session_id.to_string(), verdict.to_string());
        self.with_conn(move |conn| {
            insert_reading(conn, &session_id, tool, &symbols, &verdict, &advice, &now())
        })
        .await
    }

    async fn add_trace(&self, session_id: &str, trace: &[TraceEntry]) -> Result<(), StorageError> {
        let trace = serde_json::to_string(trace)?;
        let session_id = session_id.to_string();
        self.with_conn(move |conn| insert_trace(conn, &session_id, &trace, &now()))
            .await
    }

    async fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, StorageError> {
        let session_id = session_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT role, content, created_at FROM messages
                 WHERE session_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![session_id, limit], |row| {
                let created_at: String = row.get(2)?;
                Ok(Turn {
                    role: row.get(0)?,
                    content: row.get(1)?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })?;

            let mut turns = rows.collect::<Result<Vec<_>, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
    }

    /// All writes of the turn in one transaction
    async fn record_turn(&self, turn: &TurnRecord) -> Result<(), StorageError> {
        let reading = match &turn.reading {
            Some(r) => Some((
                r.tool,
                serde_json::to_string(&r.symbols)?,
                r.verdict.clone(),
                serde_json::to_string(&r.advice)?,
            )),
            None => None,
        };
        let trace = serde_json::to_string(&turn.trace)?;
        let (session_id, question, reply) = (
            turn.session_id.clone(),
            turn.question.clone(),
            turn.reply.clone(),
        );

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let at = now();
            upsert_session(&tx, &session_id, &at)?;
            insert_message(&tx, &session_id, ROLE_USER, &question, &at)?;
            insert_message(&tx, &session_id, ROLE_ASSISTANT, &reply, &at)?;
            if let Some((tool, symbols, verdict, advice)) = &reading {
                insert_reading(&tx, &session_id, *tool, symbols, verdict, advice, &at)?;
            }
            insert_trace(&tx, &session_id, &trace, &at)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
