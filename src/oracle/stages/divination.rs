// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::oracle::divination::{self, Reading};
use crate::oracle::workflow::graph::{Stage, StageError};
use crate::oracle::workflow::state::{Tool, WorkflowState};
use crate::oracle::workflow::trace::STAGE_DIVINATION;

/// Run the generator for the routed tool, seeded by the session id
#[derive(Default)]
pub struct DivinationStage;

impl DivinationStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for DivinationStage {
    fn name(&self) -> &str {
        STAGE_DIVINATION
    }

    async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError> {
        // An unrouted state still gets a reading
        let tool = state.tool.unwrap_or(Tool::Tarot);
        let seed_key = state.session_id().unwrap_or_default();

        let reading = divination::draw(tool, state.question(), seed_key).unwrap_or_default();
        if tool.is_divination() {
            log::info!("Drew {} reading: {}", tool, reading.verdict);
        }

        let Reading {
            symbols,
            verdict,
            advice,
        } = reading;
        Ok(WorkflowState {
            symbols: Some(symbols),
            verdict: Some(verdict),
            advice: Some(advice),
            ..Default::default()
        })
    }
}
