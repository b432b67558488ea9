// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API implementation
//!
//! Also serves OpenAI-compatible backends; DeepSeek is wired through
//! [`OpenAIModel::deepseek`].

use super::{http_client, Content, GenerationConfig, Model, Part};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;

/// OpenAI-compatible chat model implementation
pub struct OpenAIModel {
    client: Client,
    provider: String,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String, timeout: Duration) -> Result<Self, ModelError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ModelError::ApiKeyMissing("openai".into()))?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        Self::with_endpoint("openai", api_key, model_name, base_url, timeout)
    }

    /// Create a DeepSeek model through its OpenAI-compatible endpoint
    ///
    /// Requires `DEEPSEEK_API_KEY`; optionally uses `DEEPSEEK_BASE_URL`.
    pub fn deepseek(model_name: String, timeout: Duration) -> Result<Self, ModelError> {
        let api_key = env::var("DEEPSEEK_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("deepseek".into()))?;
        let base_url = env::var("DEEPSEEK_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string());

        Self::with_endpoint("deepseek", api_key, model_name, base_url, timeout)
    }

    /// Create a model against an explicit endpoint, bypassing the environment
    pub fn with_endpoint(
        provider: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: http_client(timeout)?,
            provider: provider.into(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: base_url.into(),
        })
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> serde_json::Value {
        let role = match content.role.as_str() {
            "system" => "system",
            "user" => "user",
            "model" | "assistant" => "assistant",
            other => other,
        };

        json!({
            "role": role,
            "content": content.text()
        })
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &serde_json::Value) -> Result<Content, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in response".into()))?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        // deepseek-reasoner returns its chain of thought separately
        if let Some(reasoning) = message["reasoning_content"].as_str() {
            if !reasoning.is_empty() {
                parts.push(Part::Thinking(reasoning.to_string()));
            }
        }

        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let messages: Vec<serde_json::Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        log::debug!(
            "{} request body: {}",
            self.provider,
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ModelError::api(
                &self.provider,
                format!("{}: {}", status, text),
            ));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("{} response: {}", self.provider, resp_json);

        Self::parse_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_to_openai_user_message() {
        let msg = OpenAIModel::content_to_openai_message(&Content::user("Hello"));
        assert_eq!(msg["role"], "user");
        assert_eq!(msg["content"], "Hello");
    }

    #[test]
    fn test_content_to_openai_system_message() {
        let msg = OpenAIModel::content_to_openai_message(&Content::system("You are helpful"));
        assert_eq!(msg["role"], "system");
        assert_eq!(msg["content"], "You are helpful");
    }

    #[test]
    fn test_content_to_openai_assistant_message() {
        let msg = OpenAIModel::content_to_openai_message(&Content::model("I can help"));
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["content"], "I can help");
    }

    #[test]
    fn test_parse_openai_text_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello, how can I help?"
                }
            }]
        });

        let content = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(content.role, "model");
        assert_eq!(content.text(), "Hello, how can I help?");
    }

    #[test]
    fn test_parse_deepseek_reasoning_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "reasoning_content": "x + 3 = 10",
                    "content": "x = 7"
                }
            }]
        });

        let content = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(content.parts.len(), 2);
        assert!(matches!(&content.parts[0], Part::Thinking(t) if t == "x + 3 = 10"));
        assert_eq!(content.text(), "x = 7");
    }

    #[test]
    fn test_parse_openai_without_choices_is_invalid() {
        let err = OpenAIModel::parse_openai_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
