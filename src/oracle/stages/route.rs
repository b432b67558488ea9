// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::rules;
use crate::adk::completion::CompletionClient;
use crate::adk::model::Content;
use crate::oracle::workflow::graph::{Stage, StageError};
use crate::oracle::workflow::state::{Intent, Tool, WorkflowState};
use crate::oracle::workflow::trace::STAGE_ROUTE;

const SYSTEM_PROMPT: &str = "You are an oracle routing engine. \
Select the best divination tool for the question. \
Return JSON only: {\"tool\": \"tarot|lenormand|liuyao\"}.";

/// Pick the divination tool, or `chat` for conversational turns
pub struct RouteStage {
    client: Arc<CompletionClient>,
}

impl RouteStage {
    pub fn new(client: Arc<CompletionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Stage for RouteStage {
    fn name(&self) -> &str {
        STAGE_ROUTE
    }

    async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError> {
        if state.intent() == Intent::Chat {
            return Ok(WorkflowState {
                tool: Some(Tool::Chat),
                ..Default::default()
            });
        }

        let question = state.question();
        let (domain, tone) = (state.domain(), state.tone());
        let fallback_tool = rules::rule_route(question, domain, tone);

        let messages = [
            Content::system(SYSTEM_PROMPT),
            Content::user(format!(
                "Question: {}\nDomain: {}\nTone: {}\nChoose one tool.",
                question, domain, tone
            )),
        ];
        let completion = self
            .client
            .complete_json(&messages, json!({ "tool": fallback_tool }).as_object().cloned())
            .await;

        let tool = completion
            .field::<Tool>("tool")
            .filter(Tool::is_divination)
            .unwrap_or(fallback_tool);

        log::debug!("Routed to {} (rule choice {})", tool, fallback_tool);

        Ok(WorkflowState {
            tool: Some(tool),
            ..Default::default()
        })
    }
}
