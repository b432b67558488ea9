// SPDX-License-Identifier: MIT

//! Request-level entry point over the stage graph

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::adk::completion::CompletionClient;
use crate::adk::error::{Result, WorkflowError};
use crate::oracle::divination::Symbols;
use crate::oracle::stages::{self, rules};
use crate::oracle::storage::SessionStore;
use crate::oracle::workflow::graph::CompiledGraph;
use crate::oracle::workflow::state::WorkflowState;
use crate::oracle::workflow::trace::{self, TraceEntry};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub force_divination: Option<bool>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_force_divination(mut self, force: bool) -> Self {
        self.force_divination = Some(force);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingView {
    pub symbols: Symbols,
    pub verdict: String,
    pub advice: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: String,
    /// Chosen tool name, empty when routing never happened
    pub tool: String,
    /// Normalized trace
    pub trace: Vec<TraceEntry>,
    pub reading: ReadingView,
}

impl ChatResponse {
    fn from_state(session_id: String, state: &WorkflowState) -> Self {
        Self {
            session_id,
            message: rules::reply_for(state),
            tool: state
                .tool
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            trace: trace::normalize(state.trace()),
            reading: ReadingView {
                symbols: state.symbols.clone().unwrap_or_default(),
                verdict: state.verdict().to_string(),
                advice: state.advice().to_vec(),
            },
        }
    }
}

/// Events of a streamed chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A stage finished
    Stage(TraceEntry),
    /// The turn finished
    Reply(ChatResponse),
    Error { message: String },
}

pub struct OracleAgent {
    graph: CompiledGraph,
}

impl OracleAgent {
    /// Agent running the default stage chain
    pub fn new(
        client: Arc<CompletionClient>,
        storage: Arc<dyn SessionStore>,
        history_limit: usize,
    ) -> std::result::Result<Self, WorkflowError> {
        Ok(Self::from_graph(stages::default_graph(
            client,
            storage,
            history_limit,
        )?))
    }

    pub fn from_graph(graph: CompiledGraph) -> Self {
        Self { graph }
    }

    /// Run the graph over a raw initial state
    pub async fn invoke(
        &self,
        initial: WorkflowState,
    ) -> std::result::Result<WorkflowState, WorkflowError> {
        self.graph.invoke(initial).await
    }

    fn initial_state(request: &ChatRequest) -> (String, WorkflowState) {
        let session_id = request
            .session_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let state = WorkflowState::for_question(request.message.clone())
            .with_session(session_id.clone())
            .with_force_divination(request.force_divination.unwrap_or(false));
        (session_id, state)
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let (session_id, initial) = Self::initial_state(&request);
        log::info!("Chat turn for session {}", session_id);

        let state = self.graph.invoke(initial).await?;
        Ok(ChatResponse::from_state(session_id, &state))
    }

    /// Like [`chat`](Self::chat), also sending a [`ChatEvent`] per finished
    /// stage and one for the outcome
    pub async fn chat_stream(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<ChatEvent>,
    ) -> Result<ChatResponse> {
        let (session_id, initial) = Self::initial_state(&request);
        log::info!("Streaming chat turn for session {}", session_id);

        let (trace_tx, mut trace_rx) = mpsc::channel::<TraceEntry>(16);
        let forward = async {
            while let Some(entry) = trace_rx.recv().await {
                let _ = events.send(ChatEvent::Stage(entry)).await;
            }
        };
        let (result, ()) = tokio::join!(self.graph.invoke_stream(initial, trace_tx), forward);

        match result {
            Ok(state) => {
                let response = ChatResponse::from_state(session_id, &state);
                let _ = events.send(ChatEvent::Reply(response.clone())).await;
                Ok(response)
            }
            Err(e) => {
                let _ = events
                    .send(ChatEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                Err(e.into())
            }
        }
    }
}
