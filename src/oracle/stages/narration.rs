// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::rules;
use crate::adk::completion::CompletionClient;
use crate::adk::model::Content;
use crate::oracle::storage::{SessionStore, ROLE_ASSISTANT, ROLE_USER};
use crate::oracle::workflow::graph::{Stage, StageError};
use crate::oracle::workflow::state::{Intent, Tool, Turn, WorkflowState};
use crate::oracle::workflow::trace::STAGE_NARRATION;

/// Turns of history loaded for a chat reply
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

const CHAT_PROMPT: &str = "You are a warm, supportive companion. \
Respond naturally in Chinese, keep it concise, and follow the user's tone.";

const ORACLE_PROMPT: &str = "You are an oracle narrator. Compose a concise response. \
Return JSON only: {\"message\": string}.";

/// Compose the user-facing reply
pub struct NarrationStage {
    client: Arc<CompletionClient>,
    storage: Arc<dyn SessionStore>,
    history_limit: usize,
}

impl NarrationStage {
    pub fn new(client: Arc<CompletionClient>, storage: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            storage,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// History carried in the state, else the stored tail of the session
    async fn history(&self, state: &WorkflowState) -> Vec<Turn> {
        if let Some(history) = &state.history {
            return history.clone();
        }
        let Some(session_id) = state.session_id() else {
            return Vec::new();
        };
        match self
            .storage
            .get_recent_messages(session_id, self.history_limit)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                log::warn!("Could not load history for {}: {}", session_id, e);
                Vec::new()
            }
        }
    }

    async fn chat_messages(&self, state: &WorkflowState) -> Vec<Content> {
        let mut messages = vec![Content::system(CHAT_PROMPT)];
        for turn in self.history(state).await {
            match turn.role.as_str() {
                ROLE_USER => messages.push(Content::user(turn.content)),
                ROLE_ASSISTANT => messages.push(Content::model(turn.content)),
                _ => {}
            }
        }
        messages.push(Content::user(state.question()));
        messages
    }

    fn oracle_messages(state: &WorkflowState, tool: Tool) -> Vec<Content> {
        vec![
            Content::system(ORACLE_PROMPT),
            Content::user(format!(
                "Question: {}\nTool: {}\nVerdict: {}\nAdvice: {}\nTone: {}\nNeed clarification: {}\n\
                 Explain the result clearly and relate it to the question in Chinese.",
                state.question(),
                tool,
                state.verdict(),
                state.advice().join("；"),
                state.tone(),
                state.need_clarification()
            )),
        ]
    }
}

#[async_trait]
impl Stage for NarrationStage {
    fn name(&self) -> &str {
        STAGE_NARRATION
    }

    async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError> {
        let tool = state.tool.unwrap_or(Tool::Chat);
        let messages = match state.intent() {
            Intent::Chat => self.chat_messages(state).await,
            Intent::Divination => Self::oracle_messages(state, tool),
        };

        let completion = self.client.complete_json(&messages, None).await;
        if completion.is_fallback() {
            log::debug!("Narration providers exhausted, using rule narration for {:?}", tool);
        }
        let message = completion
            .field::<String>("message")
            .or_else(|| completion.text().map(|t| t.trim().to_string()))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                rules::fallback_narration(
                    tool,
                    state.verdict(),
                    state.advice(),
                    state.tone(),
                    state.need_clarification(),
                )
            });

        Ok(WorkflowState {
            message: Some(message),
            ..Default::default()
        })
    }
}
