// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::rules;
use crate::adk::completion::CompletionClient;
use crate::adk::model::Content;
use crate::oracle::workflow::graph::{Stage, StageError};
use crate::oracle::workflow::state::{Domain, Intent, Tone, WorkflowState};
use crate::oracle::workflow::trace::STAGE_PARSE;

const SYSTEM_PROMPT: &str = "You are a classifier for oracle questions. \
Return JSON only: {\"intent\": \"chat|divination\", \"domain\": \"love|career|general\", \
\"tone\": \"gentle|direct\", \"need_clarification\": true|false}.";

/// Classify intent, domain, tone and whether the question needs more detail
pub struct ParseStage {
    client: Arc<CompletionClient>,
}

impl ParseStage {
    pub fn new(client: Arc<CompletionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Stage for ParseStage {
    fn name(&self) -> &str {
        STAGE_PARSE
    }

    async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError> {
        let question = state.question();
        let force = state.force_divination();
        let rules = rules::parse_question(question);

        let messages = [
            Content::system(SYSTEM_PROMPT),
            Content::user(format!(
                "Question: {}\nDecide intent, domain, tone, and whether more clarification is needed.",
                question
            )),
        ];
        let fallback = json!({
            "domain": rules.domain,
            "tone": rules.tone,
            "need_clarification": rules.need_clarification,
        });
        let completion = self
            .client
            .complete_json(&messages, fallback.as_object().cloned())
            .await;

        let domain = completion.field::<Domain>("domain").unwrap_or(rules.domain);
        let tone = completion.field::<Tone>("tone").unwrap_or(rules.tone);
        let need_clarification = completion
            .field::<bool>("need_clarification")
            .unwrap_or(rules.need_clarification)
            || question.trim().is_empty();

        let intent = if force {
            Intent::Divination
        } else {
            completion
                .field::<Intent>("intent")
                .unwrap_or_else(|| rules::detect_intent(question, domain, need_clarification))
        };

        log::debug!(
            "Parsed question: intent={}, domain={}, tone={}, need_clarification={}",
            intent,
            domain,
            tone,
            need_clarification
        );

        Ok(WorkflowState {
            intent: Some(intent),
            domain: Some(domain),
            tone: Some(tone),
            need_clarification: Some(need_clarification),
            ..Default::default()
        })
    }
}
