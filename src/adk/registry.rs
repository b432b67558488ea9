// SPDX-License-Identifier: MIT

use crate::adk::model::Model;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Provider name -> model lookup shared by every completion call
#[derive(Clone)]
pub struct ModelRegistry {
    models: Arc<RwLock<HashMap<String, Arc<dyn Model>>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, provider: impl Into<String>, model: Arc<dyn Model>) {
        let mut models = self.models.write().await;
        models.insert(provider.into(), model);
    }

    pub async fn get(&self, provider: &str) -> Option<Arc<dyn Model>> {
        let models = self.models.read().await;
        models.get(provider).cloned()
    }

    /// Registered provider names, sorted
    pub async fn providers(&self) -> Vec<String> {
        let models = self.models.read().await;
        let mut names: Vec<String> = models.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
