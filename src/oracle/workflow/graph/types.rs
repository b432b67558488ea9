// SPDX-License-Identifier: MIT

//! Stage graph definitions
//!
//! A workflow is a set of named stages joined by edges. Edges may carry a
//! predicate over the accumulated state; the first edge whose predicate
//! holds decides the next stage. A run ends at a stage with no applicable
//! edge, or right after a stage marked terminal.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::sync::Arc;

use super::executor::CompiledGraph;
use crate::adk::error::WorkflowError;
use crate::oracle::workflow::state::WorkflowState;

/// Error type returned by a stage body
pub type StageError = Box<dyn Error + Send + Sync>;

/// Predicate deciding whether an edge is taken
pub type EdgeCondition = Arc<dyn Fn(&WorkflowState) -> bool + Send + Sync>;

/// A named unit of work transforming workflow state
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Return a patch holding only the fields this stage produced
    async fn run(&self, state: &WorkflowState) -> Result<WorkflowState, StageError>;

    /// Whether a fault in this stage ends the invocation with an error
    /// instead of being recorded and skipped past
    fn aborts_on_error(&self) -> bool {
        false
    }
}

/// Directed edge between two stages
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub when: Option<EdgeCondition>,
}

impl Edge {
    pub fn applies(&self, state: &WorkflowState) -> bool {
        self.when.as_ref().map_or(true, |f| f(state))
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("conditional", &self.when.is_some())
            .finish()
    }
}

/// Builder for a stage graph
#[derive(Default)]
pub struct StageGraph {
    stages: Vec<Arc<dyn Stage>>,
    edges: Vec<Edge>,
    entry: Option<String>,
    terminals: HashSet<String>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            when: None,
        });
        self
    }

    /// Add an edge taken only when `when` holds for the current state
    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        when: F,
    ) -> Self
    where
        F: Fn(&WorkflowState) -> bool + Send + Sync + 'static,
    {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            when: Some(Arc::new(when)),
        });
        self
    }

    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Mark `name` as an exit: the run ends once it has executed, whatever
    /// its outgoing edges
    pub fn terminal(mut self, name: impl Into<String>) -> Self {
        self.terminals.insert(name.into());
        self
    }

    /// Add the stages in order and link each to the next. The first becomes
    /// the entry unless one was already set.
    pub fn chain(mut self, stages: Vec<Arc<dyn Stage>>) -> Self {
        let names: Vec<String> = stages.iter().map(|s| s.name().to_string()).collect();
        if self.entry.is_none() {
            self.entry = names.first().cloned();
        }
        for stage in stages {
            self = self.add_stage(stage);
        }
        for pair in names.windows(2) {
            self = self.add_edge(pair[0].clone(), pair[1].clone());
        }
        self
    }

    /// Validate the graph and freeze it for execution
    pub fn compile(self) -> Result<CompiledGraph, WorkflowError> {
        let mut stages: HashMap<String, Arc<dyn Stage>> = HashMap::new();
        for stage in self.stages {
            let name = stage.name().to_string();
            if stages.insert(name.clone(), stage).is_some() {
                return Err(WorkflowError::DuplicateStage(name));
            }
        }

        let entry = self.entry.ok_or(WorkflowError::MissingEntry)?;
        if !stages.contains_key(&entry) {
            return Err(WorkflowError::UnknownStage(entry));
        }

        let ends = self.edges.iter().flat_map(|e| [&e.from, &e.to]);
        if let Some(unknown) = ends
            .chain(self.terminals.iter())
            .find(|name| !stages.contains_key(name.as_str()))
        {
            return Err(WorkflowError::UnknownStage(unknown.clone()));
        }

        Ok(CompiledGraph::new(entry, stages, self.edges, self.terminals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Stage for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _state: &WorkflowState) -> Result<WorkflowState, StageError> {
            Ok(WorkflowState::default())
        }
    }

    fn stage(name: &'static str) -> Arc<dyn Stage> {
        Arc::new(Named(name))
    }

    #[test]
    fn test_compile_requires_entry() {
        let result = StageGraph::new().add_stage(stage("a")).compile();
        assert!(matches!(result, Err(WorkflowError::MissingEntry)));
    }

    #[test]
    fn test_compile_rejects_unknown_entry() {
        let result = StageGraph::new().add_stage(stage("a")).entry("b").compile();
        assert!(matches!(result, Err(WorkflowError::UnknownStage(name)) if name == "b"));
    }

    #[test]
    fn test_compile_rejects_dangling_edge() {
        let result = StageGraph::new()
            .add_stage(stage("a"))
            .add_edge("a", "missing")
            .entry("a")
            .compile();
        assert!(matches!(result, Err(WorkflowError::UnknownStage(name)) if name == "missing"));
    }

    #[test]
    fn test_compile_rejects_duplicate_names() {
        let result = StageGraph::new()
            .add_stage(stage("a"))
            .add_stage(stage("a"))
            .entry("a")
            .compile();
        assert!(matches!(result, Err(WorkflowError::DuplicateStage(_))));
    }

    #[test]
    fn test_compile_rejects_unknown_terminal() {
        let result = StageGraph::new()
            .add_stage(stage("a"))
            .entry("a")
            .terminal("b")
            .compile();
        assert!(matches!(result, Err(WorkflowError::UnknownStage(name)) if name == "b"));
    }

    #[test]
    fn test_chain_sets_entry_and_edges() {
        let graph = StageGraph::new()
            .chain(vec![stage("a"), stage("b"), stage("c")])
            .compile()
            .unwrap();
        assert_eq!(graph.entry(), "a");
        assert_eq!(graph.stage_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unconditional_edge_always_applies() {
        let edge = Edge {
            from: "a".to_string(),
            to: "b".to_string(),
            when: None,
        };
        assert!(edge.applies(&WorkflowState::default()));
    }
}
