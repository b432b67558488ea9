// SPDX-License-Identifier: MIT

//! Stage graph executor

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::{Edge, Stage};
use crate::adk::error::WorkflowError;
use crate::oracle::workflow::state::WorkflowState;
use crate::oracle::workflow::trace::{self, TraceEntry, TraceStatus};

/// Safety limit on stage executions per invocation
pub const MAX_STEPS: usize = 100;

/// Validated stage graph ready for execution
pub struct CompiledGraph {
    entry: String,
    stages: HashMap<String, Arc<dyn Stage>>,
    edges: Vec<Edge>,
    terminals: HashSet<String>,
    max_steps: usize,
}

impl CompiledGraph {
    pub(super) fn new(
        entry: String,
        stages: HashMap<String, Arc<dyn Stage>>,
        edges: Vec<Edge>,
        terminals: HashSet<String>,
    ) -> Self {
        Self {
            entry,
            stages,
            edges,
            terminals,
            max_steps: MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Registered stage names, sorted
    pub fn stage_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stages.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Next stage after `from`: the first edge whose condition holds
    fn next_stage(&self, from: &str, state: &WorkflowState) -> Option<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == from)
            .find(|e| e.applies(state))
            .map(|e| e.to.as_str())
    }

    /// Run the graph to completion
    pub async fn invoke(&self, initial: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        self.run(initial, None).await
    }

    /// Run the graph, sending each trace entry as soon as its stage ends
    pub async fn invoke_stream(
        &self,
        initial: WorkflowState,
        events: mpsc::Sender<TraceEntry>,
    ) -> Result<WorkflowState, WorkflowError> {
        self.run(initial, Some(events)).await
    }

    async fn run(
        &self,
        initial: WorkflowState,
        events: Option<mpsc::Sender<TraceEntry>>,
    ) -> Result<WorkflowState, WorkflowError> {
        let mut state = initial;
        let mut current = Some(self.entry.clone());
        let mut steps = 0;

        while let Some(name) = current {
            steps += 1;
            if steps > self.max_steps {
                log::error!("Workflow exceeded {} steps", self.max_steps);
                return Err(WorkflowError::MaxSteps(self.max_steps));
            }

            let stage = self
                .stages
                .get(&name)
                .ok_or_else(|| WorkflowError::UnknownStage(name.clone()))?;

            state = self.execute_stage(stage.as_ref(), state).await?;

            if let (Some(tx), Some(entry)) = (&events, state.trace().last()) {
                // A dropped receiver only means nobody is listening any more
                let _ = tx.send(entry.clone()).await;
            }

            if self.terminals.contains(&name) {
                log::debug!("Stage {} is terminal, stopping", name);
                break;
            }
            current = self.next_stage(&name, &state).map(str::to_string);
        }

        Ok(state)
    }

    async fn execute_stage(
        &self,
        stage: &dyn Stage,
        state: WorkflowState,
    ) -> Result<WorkflowState, WorkflowError> {
        let name = stage.name();
        let input = trace::snapshot(&state);

        // Keep start times non-decreasing even if the wall clock steps back
        let now = Utc::now();
        let started_at = state
            .trace()
            .last()
            .map_or(now, |last| now.max(last.started_at));

        log::info!("Executing stage: {}", name);
        let (patch, status) = match stage.run(&state).await {
            Ok(patch) => {
                log::info!("Stage {} completed", name);
                (patch, TraceStatus::Ok)
            }
            Err(e) => {
                log::error!("Stage {} failed: {}", name, e);
                if stage.aborts_on_error() {
                    return Err(WorkflowError::StageFailed {
                        stage: name.to_string(),
                        message: e.to_string(),
                    });
                }
                (WorkflowState::from_error(e.to_string()), TraceStatus::Error)
            }
        };

        let patch = trace::record(&state, name, input, patch, status, started_at);
        Ok(state.merge(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::workflow::graph::types::{StageError, StageGraph};
    use crate::oracle::workflow::state::{Intent, Tool};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed patch and remembers the state it saw
    struct FixedStage {
        name: &'static str,
        patch: WorkflowState,
        seen: Arc<Mutex<Vec<WorkflowState>>>,
    }

    impl FixedStage {
        fn new(name: &'static str, patch: WorkflowState) -> Arc<Self> {
            Arc::new(Self {
                name,
                patch,
                seen: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    #[async_trait]
    impl Stage for FixedStage {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError> {
            self.seen.lock().unwrap().push(state.clone());
            Ok(self.patch.clone())
        }
    }

    struct FailingStage {
        name: &'static str,
        aborts: bool,
    }

    #[async_trait]
    impl Stage for FailingStage {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, _state: &WorkflowState) -> Result<WorkflowState, StageError> {
            Err("stage exploded".into())
        }

        fn aborts_on_error(&self) -> bool {
            self.aborts
        }
    }

    fn nodes(state: &WorkflowState) -> Vec<&str> {
        state.trace().iter().map(|e| e.node.as_str()).collect()
    }

    #[tokio::test]
    async fn test_sequential_patches_merge_in_order() {
        let a = FixedStage::new(
            "a",
            WorkflowState {
                intent: Some(Intent::Divination),
                ..Default::default()
            },
        );
        let b = FixedStage::new(
            "b",
            WorkflowState {
                tool: Some(Tool::Tarot),
                ..Default::default()
            },
        );

        let graph = StageGraph::new()
            .chain(vec![a.clone(), b.clone()])
            .compile()
            .unwrap();

        let out = graph.invoke(WorkflowState::for_question("q")).await.unwrap();

        assert_eq!(out.intent, Some(Intent::Divination));
        assert_eq!(out.tool, Some(Tool::Tarot));
        assert_eq!(out.question(), "q");
        assert_eq!(nodes(&out), vec!["a", "b"]);

        // b sees a's patch already merged
        let seen_by_b = b.seen.lock().unwrap()[0].clone();
        assert_eq!(seen_by_b.intent, Some(Intent::Divination));
    }

    #[tokio::test]
    async fn test_trace_input_is_snapshot_before_stage() {
        let a = FixedStage::new(
            "a",
            WorkflowState {
                verdict: Some("v".to_string()),
                ..Default::default()
            },
        );
        let graph = StageGraph::new().chain(vec![a]).compile().unwrap();

        let out = graph.invoke(WorkflowState::for_question("q")).await.unwrap();
        let entry = &out.trace()[0];

        assert_eq!(entry.input["question"], "q");
        assert_eq!(entry.input["verdict"], serde_json::Value::Null);
        assert_eq!(entry.output["verdict"], "v");
        assert_eq!(entry.status, TraceStatus::Ok);
        assert!(entry.ended_at >= entry.started_at);
    }

    #[tokio::test]
    async fn test_conditional_edge_picks_first_match() {
        let start = FixedStage::new(
            "start",
            WorkflowState {
                intent: Some(Intent::Chat),
                ..Default::default()
            },
        );
        let divine = FixedStage::new("divine", WorkflowState::default());
        let talk = FixedStage::new("talk", WorkflowState::default());

        let graph = StageGraph::new()
            .add_stage(start)
            .add_stage(divine.clone())
            .add_stage(talk.clone())
            .add_conditional_edge("start", "divine", |s| s.intent() == Intent::Divination)
            .add_edge("start", "talk")
            .entry("start")
            .compile()
            .unwrap();

        let out = graph.invoke(WorkflowState::default()).await.unwrap();

        assert_eq!(nodes(&out), vec!["start", "talk"]);
        assert!(divine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fault_is_recorded_and_execution_continues() {
        let after = FixedStage::new("after", WorkflowState::default());
        let graph = StageGraph::new()
            .chain(vec![
                Arc::new(FailingStage {
                    name: "flaky",
                    aborts: false,
                }),
                after.clone(),
            ])
            .compile()
            .unwrap();

        let out = graph.invoke(WorkflowState::default()).await.unwrap();

        assert_eq!(nodes(&out), vec!["flaky", "after"]);
        assert_eq!(out.trace()[0].status, TraceStatus::Error);
        assert_eq!(out.error.as_deref(), Some("stage exploded"));
        assert_eq!(after.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_aborting_stage_propagates_error() {
        let graph = StageGraph::new()
            .chain(vec![Arc::new(FailingStage {
                name: "persist",
                aborts: true,
            })])
            .compile()
            .unwrap();

        let result = graph.invoke(WorkflowState::default()).await;

        assert!(matches!(
            result,
            Err(WorkflowError::StageFailed { stage, .. }) if stage == "persist"
        ));
    }

    #[tokio::test]
    async fn test_cycle_hits_step_limit() {
        let graph = StageGraph::new()
            .add_stage(FixedStage::new("loop", WorkflowState::default()))
            .add_edge("loop", "loop")
            .entry("loop")
            .compile()
            .unwrap()
            .with_max_steps(5);

        let result = graph.invoke(WorkflowState::default()).await;
        assert!(matches!(result, Err(WorkflowError::MaxSteps(5))));
    }

    #[tokio::test]
    async fn test_terminal_stage_ends_run_despite_edges() {
        let a = FixedStage::new("a", WorkflowState::default());
        let b = FixedStage::new("b", WorkflowState::default());
        let graph = StageGraph::new()
            .add_stage(a.clone())
            .add_stage(b.clone())
            .add_edge("a", "b")
            .add_edge("b", "a")
            .entry("a")
            .terminal("b")
            .compile()
            .unwrap();

        let out = graph.invoke(WorkflowState::default()).await.unwrap();

        assert_eq!(nodes(&out), vec!["a", "b"]);
        assert_eq!(a.seen.lock().unwrap().len(), 1);
        assert_eq!(b.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_entry_runs_once() {
        let graph = StageGraph::new()
            .add_stage(FixedStage::new("only", WorkflowState::default()))
            .add_edge("only", "only")
            .entry("only")
            .terminal("only")
            .compile()
            .unwrap();

        let out = graph.invoke(WorkflowState::default()).await.unwrap();
        assert_eq!(nodes(&out), vec!["only"]);
    }

    #[tokio::test]
    async fn test_invoke_stream_emits_entries_in_order() {
        let graph = StageGraph::new()
            .chain(vec![
                FixedStage::new("a", WorkflowState::default()),
                FixedStage::new("b", WorkflowState::default()),
            ])
            .compile()
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let out = graph
            .invoke_stream(WorkflowState::default(), tx)
            .await
            .unwrap();

        let mut streamed = Vec::new();
        while let Some(entry) = rx.recv().await {
            streamed.push(entry);
        }

        assert_eq!(streamed, out.trace().to_vec());
        assert!(streamed[0].started_at <= streamed[1].started_at);
    }
}
