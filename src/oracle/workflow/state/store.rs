// SPDX-License-Identifier: MIT

//! Request-scoped workflow state and the patch merge

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{Domain, Intent, Tone, Tool, Turn};
use crate::oracle::divination::Symbols;
use crate::oracle::workflow::trace::TraceEntry;

/// State threaded through the stages of one invocation
///
/// Every field is optional. A stage receives the accumulated state and
/// returns a value of the same type holding only the fields it produced;
/// [`WorkflowState::merge`] folds that patch in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need_clarification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_divination: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Symbols>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Turn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
    /// Description of the most recent stage fault
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowState {
    /// Initial state for a question
    pub fn for_question(question: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
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

    /// Patch carrying a stage fault
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Fold a stage patch into this state. Fields present in the patch win.
    pub fn merge(self, patch: WorkflowState) -> WorkflowState {
        WorkflowState {
            session_id: patch.session_id.or(self.session_id),
            question: patch.question.or(self.question),
            domain: patch.domain.or(self.domain),
            tone: patch.tone.or(self.tone),
            need_clarification: patch.need_clarification.or(self.need_clarification),
            intent: patch.intent.or(self.intent),
            force_divination: patch.force_divination.or(self.force_divination),
            tool: patch.tool.or(self.tool),
            symbols: patch.symbols.or(self.symbols),
            verdict: patch.verdict.or(self.verdict),
            advice: patch.advice.or(self.advice),
            message: patch.message.or(self.message),
            history: patch.history.or(self.history),
            trace: patch.trace.or(self.trace),
            persisted: patch.persisted.or(self.persisted),
            error: patch.error.or(self.error),
        }
    }

    pub fn question(&self) -> &str {
        self.question.as_deref().unwrap_or_default()
    }

    /// Session id, treating an empty string as absent
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn domain(&self) -> Domain {
        self.domain.unwrap_or_default()
    }

    pub fn tone(&self) -> Tone {
        self.tone.unwrap_or_default()
    }

    pub fn intent(&self) -> Intent {
        self.intent.unwrap_or_default()
    }

    pub fn need_clarification(&self) -> bool {
        self.need_clarification.unwrap_or(false)
    }

    pub fn force_divination(&self) -> bool {
        self.force_divination.unwrap_or(false)
    }

    pub fn verdict(&self) -> &str {
        self.verdict.as_deref().unwrap_or_default()
    }

    pub fn advice(&self) -> &[String] {
        self.advice.as_deref().unwrap_or_default()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        self.trace.as_deref().unwrap_or_default()
    }

    /// JSON object of the present fields
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}
