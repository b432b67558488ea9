// SPDX-License-Identifier: MIT

//! Model module - defines the chat-completion trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [gemini] - Google's Gemini API
//! - [openai] - OpenAI's chat completions API (and compatible endpoints such as DeepSeek)

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::adk::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

/// Safe range for the per-call output token ceiling
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 64..=4096;

/// Default output token ceiling
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Clamp a requested token ceiling into [`MAX_TOKENS_RANGE`]
pub fn clamp_max_tokens(requested: u32) -> u32 {
    requested.clamp(*MAX_TOKENS_RANGE.start(), *MAX_TOKENS_RANGE.end())
}

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Thinking/reasoning content from thinking models; never part of the answer text
    Thinking(String),
}

impl Content {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", text)
    }

    /// Assistant turn. Stored as "model" and mapped per provider.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new("model", text)
    }

    /// Concatenated text parts, thinking excluded
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect()
    }
}

/// Default per-request timeout for provider calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client whose requests fail after `timeout`
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ModelError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Default model name per provider
pub fn default_model_name(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some("gemini-1.5-flash"),
        "openai" => Some("gpt-4o-mini"),
        "anthropic" => Some("claude-3-5-haiku-latest"),
        "deepseek" => Some("deepseek-chat"),
        _ => None,
    }
}

/// Build the adapter for a provider name, reading credentials from the
/// environment
pub fn from_provider(
    provider: &str,
    model_name: String,
    timeout: Duration,
) -> Result<Arc<dyn Model>, ModelError> {
    let model: Arc<dyn Model> = match provider {
        "gemini" => Arc::new(gemini::GeminiModel::new(model_name, timeout)?),
        "openai" => Arc::new(openai::OpenAIModel::new(model_name, timeout)?),
        "anthropic" => Arc::new(anthropic::AnthropicModel::new(model_name, timeout)?),
        "deepseek" => Arc::new(openai::OpenAIModel::deepseek(model_name, timeout)?),
        other => return Err(ModelError::UnsupportedProvider(other.to_string())),
    };
    Ok(model)
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(matches!(
            from_provider("mystery", "m".to_string(), DEFAULT_REQUEST_TIMEOUT),
            Err(ModelError::UnsupportedProvider(name)) if name == "mystery"
        ));
        assert_eq!(default_model_name("mystery"), None);
        assert_eq!(default_model_name("deepseek"), Some("deepseek-chat"));
    }

    #[test]
    fn test_clamp_max_tokens() {
        assert_eq!(clamp_max_tokens(1), 64);
        assert_eq!(clamp_max_tokens(512), 512);
        assert_eq!(clamp_max_tokens(100_000), 4096);
    }

    #[test]
    fn test_content_text_skips_thinking() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![
                Part::Thinking("hmm".to_string()),
                Part::Text("a".to_string()),
                Part::Text("b".to_string()),
            ],
        };
        assert_eq!(content.text(), "ab");
    }
}
