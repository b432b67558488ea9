// SPDX-License-Identifier: MIT

//! The five oracle stages and the default chain that links them

mod divination;
mod narration;
mod parse;
mod persist;
mod route;
pub mod rules;

use std::sync::Arc;

use crate::adk::completion::CompletionClient;
use crate::adk::error::WorkflowError;
use crate::oracle::storage::SessionStore;
use crate::oracle::workflow::graph::{CompiledGraph, Stage, StageGraph};
use crate::oracle::workflow::trace::STAGE_PERSIST;

pub use divination::DivinationStage;
pub use narration::{NarrationStage, DEFAULT_HISTORY_LIMIT};
pub use parse::ParseStage;
pub use persist::PersistStage;
pub use route::RouteStage;

/// parse → route → divination → narration → persist
pub fn default_graph(
    client: Arc<CompletionClient>,
    storage: Arc<dyn SessionStore>,
    history_limit: usize,
) -> Result<CompiledGraph, WorkflowError> {
    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(ParseStage::new(client.clone())),
        Arc::new(RouteStage::new(client.clone())),
        Arc::new(DivinationStage::new()),
        Arc::new(NarrationStage::new(client, storage.clone()).with_history_limit(history_limit)),
        Arc::new(PersistStage::new(storage)),
    ];
    StageGraph::new()
        .chain(stages)
        .terminal(STAGE_PERSIST)
        .compile()
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use crate::adk::completion::CompletionClient;
    use crate::adk::error::ModelError;
    use crate::adk::model::{Content, GenerationConfig, Model};
    use crate::adk::registry::ModelRegistry;

    /// Replays canned replies and records every prompt
    pub struct RecordingModel {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<Vec<Content>>>,
    }

    impl RecordingModel {
        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn last_prompt(&self) -> Vec<Content> {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Model for RecordingModel {
        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
        ) -> Result<Content, ModelError> {
            self.prompts.lock().unwrap().push(history.to_vec());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(ModelError::api("mock", "no reply scripted"));
            }
            Ok(Content::model(replies.remove(0)))
        }
    }

    pub async fn recording_client(
        replies: Vec<&str>,
    ) -> (Arc<CompletionClient>, Arc<RecordingModel>) {
        let model = Arc::new(RecordingModel {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            prompts: Mutex::new(Vec::new()),
        });
        let registry = ModelRegistry::new();
        registry.register("mock", model.clone()).await;
        let client = CompletionClient::new(registry, vec!["mock".to_string()]).with_retries(0);
        (Arc::new(client), model)
    }

    pub async fn client(replies: Vec<&str>) -> Arc<CompletionClient> {
        recording_client(replies).await.0
    }

    /// No provider configured: every completion is the fallback
    pub fn offline_client() -> Arc<CompletionClient> {
        Arc::new(CompletionClient::new(ModelRegistry::new(), vec![]))
    }
}
