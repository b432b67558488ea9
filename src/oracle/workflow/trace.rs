// SPDX-License-Identifier: MIT

//! Per-stage execution trace
//!
//! Every stage execution appends one [`TraceEntry`]. Entries are never
//! edited after the fact; [`normalize`] collapses a trace to one entry per
//! known stage in canonical order before it is stored or returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::state::{Domain, Intent, Tone, Tool, WorkflowState};
use crate::oracle::divination::Symbols;

pub const STAGE_PARSE: &str = "parse";
pub const STAGE_ROUTE: &str = "route";
pub const STAGE_DIVINATION: &str = "divination";
pub const STAGE_NARRATION: &str = "narration";
pub const STAGE_PERSIST: &str = "persist";

/// Canonical stage order used by [`normalize`]
pub const CANONICAL_ORDER: [&str; 5] = [
    STAGE_PARSE,
    STAGE_ROUTE,
    STAGE_DIVINATION,
    STAGE_NARRATION,
    STAGE_PERSIST,
];

/// State fields captured in an entry's input snapshot
pub const TRACE_KEYS: [&str; 12] = [
    "session_id",
    "question",
    "domain",
    "tone",
    "need_clarification",
    "intent",
    "force_divination",
    "tool",
    "symbols",
    "verdict",
    "advice",
    "message",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Ok,
    Error,
}

/// Record of one stage execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub node: String,
    pub input: Value,
    pub output: Value,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: TraceStatus,
}

/// Borrowed view over the [`TRACE_KEYS`] fields of a state
#[derive(Serialize)]
struct TraceInput<'a> {
    session_id: &'a Option<String>,
    question: &'a Option<String>,
    domain: &'a Option<Domain>,
    tone: &'a Option<Tone>,
    need_clarification: &'a Option<bool>,
    intent: &'a Option<Intent>,
    force_divination: &'a Option<bool>,
    tool: &'a Option<Tool>,
    symbols: &'a Option<Symbols>,
    verdict: &'a Option<String>,
    advice: &'a Option<Vec<String>>,
    message: &'a Option<String>,
}

impl<'a> From<&'a WorkflowState> for TraceInput<'a> {
    fn from(state: &'a WorkflowState) -> Self {
        Self {
            session_id: &state.session_id,
            question: &state.question,
            domain: &state.domain,
            tone: &state.tone,
            need_clarification: &state.need_clarification,
            intent: &state.intent,
            force_divination: &state.force_divination,
            tool: &state.tool,
            symbols: &state.symbols,
            verdict: &state.verdict,
            advice: &state.advice,
            message: &state.message,
        }
    }
}

/// Snapshot of the trace-relevant fields, absent ones as `null`
///
/// History and the trace itself are never serialized here.
pub fn snapshot(state: &WorkflowState) -> Value {
    serde_json::to_value(TraceInput::from(state)).unwrap_or_else(|e| {
        log::warn!("Trace snapshot failed: {}", e);
        Value::Object(Map::new())
    })
}

/// Attach a new entry for `node` to the patch
///
/// The returned patch carries `base`'s trace plus the new entry, so merging
/// it into `base` grows the trace by exactly one.
pub fn record(
    base: &WorkflowState,
    node: &str,
    input: Value,
    output: WorkflowState,
    status: TraceStatus,
    started_at: DateTime<Utc>,
) -> WorkflowState {
    let output_json = match status {
        TraceStatus::Ok => output.to_json(),
        TraceStatus::Error => json!({ "error": output.error.clone().unwrap_or_default() }),
    };

    let mut trace = base.trace().to_vec();
    trace.push(TraceEntry {
        node: node.to_string(),
        input,
        output: output_json,
        started_at,
        ended_at: Utc::now(),
        status,
    });

    WorkflowState {
        trace: Some(trace),
        ..output
    }
}

/// Collapse a trace to the last entry per known stage, in canonical order
pub fn normalize(trace: &[TraceEntry]) -> Vec<TraceEntry> {
    let mut last_by_node: HashMap<&str, &TraceEntry> = HashMap::new();
    for entry in trace {
        last_by_node.insert(entry.node.as_str(), entry);
    }

    CANONICAL_ORDER
        .iter()
        .filter_map(|node| last_by_node.get(node).map(|e| (*e).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::workflow::state::{Domain, Turn};

    fn entry(node: &str, marker: i64) -> TraceEntry {
        let now = Utc::now();
        TraceEntry {
            node: node.to_string(),
            input: json!({}),
            output: json!({ "marker": marker }),
            started_at: now,
            ended_at: now,
            status: TraceStatus::Ok,
        }
    }

    fn nodes(trace: &[TraceEntry]) -> Vec<&str> {
        trace.iter().map(|e| e.node.as_str()).collect()
    }

    #[test]
    fn test_snapshot_covers_trace_keys_only() {
        let state = WorkflowState {
            question: Some("q".to_string()),
            domain: Some(Domain::Career),
            history: Some(vec![Turn {
                role: "user".to_string(),
                content: "earlier".to_string(),
                created_at: Utc::now(),
            }]),
            trace: Some(vec![entry("parse", 1), entry("route", 2)]),
            persisted: Some(true),
            ..Default::default()
        };

        let snap = snapshot(&state);
        let obj = snap.as_object().unwrap();

        assert_eq!(obj.len(), TRACE_KEYS.len());
        assert_eq!(obj["question"], "q");
        assert_eq!(obj["domain"], "career");
        assert_eq!(obj["tool"], Value::Null);
        assert!(!obj.contains_key("history"));
        assert!(!obj.contains_key("persisted"));
        assert!(!obj.contains_key("trace"));
        for key in TRACE_KEYS {
            assert!(obj.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn test_record_appends_without_touching_earlier_entries() {
        let base = WorkflowState {
            trace: Some(vec![entry("parse", 1)]),
            ..Default::default()
        };
        let patch = WorkflowState {
            persisted: Some(false),
            ..Default::default()
        };

        let out = record(&base, "persist", json!({}), patch, TraceStatus::Ok, Utc::now());
        let trace = out.trace.as_ref().unwrap();

        assert_eq!(nodes(trace), vec!["parse", "persist"]);
        assert_eq!(trace[0], base.trace()[0]);
        assert_eq!(trace[1].output, json!({"persisted": false}));
        assert_eq!(out.persisted, Some(false));
    }

    #[test]
    fn test_record_same_stage_twice_adds_new_entry() {
        let base = WorkflowState {
            trace: Some(vec![entry("route", 1)]),
            ..Default::default()
        };
        let out = record(
            &base,
            "route",
            json!({}),
            WorkflowState::default(),
            TraceStatus::Ok,
            Utc::now(),
        );
        assert_eq!(nodes(out.trace()), vec!["route", "route"]);
    }

    #[test]
    fn test_record_error_output_carries_description() {
        let out = record(
            &WorkflowState::default(),
            "narration",
            json!({}),
            WorkflowState::from_error("boom"),
            TraceStatus::Error,
            Utc::now(),
        );
        let trace = out.trace();
        assert_eq!(trace[0].status, TraceStatus::Error);
        assert_eq!(trace[0].output, json!({"error": "boom"}));
        assert_eq!(out.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_normalize_last_write_wins_in_canonical_order() {
        let trace = vec![
            entry("narration", 1),
            entry("parse", 2),
            entry("bogus", 3),
            entry("route", 4),
            entry("parse", 5),
        ];

        let normalized = normalize(&trace);

        assert_eq!(nodes(&normalized), vec!["parse", "route", "narration"]);
        assert_eq!(normalized[0].output["marker"], 5);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let trace = vec![
            entry("persist", 1),
            entry("divination", 2),
            entry("parse", 3),
            entry("divination", 4),
            entry("unknown", 5),
        ];

        let once = normalize(&trace);
        let twice = normalize(&once);

        assert_eq!(once, twice);
        assert_eq!(nodes(&once), vec!["parse", "divination", "persist"]);
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_trace_entry_serializes_status_lowercase() {
        let value = serde_json::to_value(entry("parse", 0)).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["node"], "parse");
    }
}
