// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::rules;
use crate::oracle::storage::{ReadingRecord, SessionStore, TurnRecord};
use crate::oracle::workflow::graph::{Stage, StageError};
use crate::oracle::workflow::state::WorkflowState;
use crate::oracle::workflow::trace::{self, STAGE_PERSIST};

/// Store the finished turn for its session
///
/// Without a session id nothing is written. A storage fault ends the
/// invocation with an error.
pub struct PersistStage {
    storage: Arc<dyn SessionStore>,
}

impl PersistStage {
    pub fn new(storage: Arc<dyn SessionStore>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Stage for PersistStage {
    fn name(&self) -> &str {
        STAGE_PERSIST
    }

    async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError> {
        let Some(session_id) = state.session_id() else {
            log::debug!("No session id, skipping persistence");
            return Ok(WorkflowState {
                persisted: Some(false),
                ..Default::default()
            });
        };

        let reading = state
            .tool
            .filter(|t| t.is_divination())
            .map(|tool| ReadingRecord {
                tool,
                symbols: state.symbols.clone().unwrap_or_default(),
                verdict: state.verdict().to_string(),
                advice: state.advice().to_vec(),
            });

        let turn = TurnRecord {
            session_id: session_id.to_string(),
            question: state.question().to_string(),
            reply: rules::reply_for(state),
            reading,
            trace: trace::normalize(state.trace()),
        };

        self.storage.record_turn(&turn).await?;
        log::info!("Persisted turn for session {}", session_id);

        Ok(WorkflowState {
            persisted: Some(true),
            ..Default::default()
        })
    }

    fn aborts_on_error(&self) -> bool {
        true
    }
}
