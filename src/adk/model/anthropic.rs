// SPDX-License-Identifier: MIT

//! Anthropic Model - Claude messages API implementation

use super::{http_client, Content, GenerationConfig, Model, Part, DEFAULT_MAX_TOKENS};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;

/// Anthropic Claude model implementation
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl AnthropicModel {
    /// Create a new AnthropicModel
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    /// Optionally uses `ANTHROPIC_BASE_URL` for custom endpoints.
    pub fn new(model_name: String, timeout: Duration) -> Result<Self, ModelError> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("anthropic".into()))?;
        let base_url = env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string());

        Self::with_endpoint(api_key, model_name, base_url, timeout)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: base_url.into(),
        })
    }

    /// Collect system messages; Anthropic takes them as a top-level field
    fn extract_system_message(history: &[Content]) -> Option<String> {
        let system: Vec<String> = history
            .iter()
            .filter(|c| c.role == "system")
            .map(Content::text)
            .filter(|t| !t.is_empty())
            .collect();

        if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        }
    }

    /// Convert internal Content to Anthropic message format
    fn content_to_anthropic_message(content: &Content) -> Option<serde_json::Value> {
        if content.role == "system" {
            return None;
        }

        let role = match content.role.as_str() {
            "user" => "user",
            "model" | "assistant" => "assistant",
            other => other,
        };

        let text = content.text();
        if text.is_empty() {
            return None;
        }

        Some(json!({
            "role": role,
            "content": [{ "type": "text", "text": text }]
        }))
    }

    /// Parse Anthropic response into Content
    fn parse_anthropic_response(response: &serde_json::Value) -> Result<Content, ModelError> {
        let content_blocks = response["content"]
            .as_array()
            .ok_or_else(|| ModelError::InvalidResponse("No content in response".into()))?;

        let mut parts = Vec::new();

        for block in content_blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        if !text.is_empty() {
                            parts.push(Part::Text(text.to_string()));
                        }
                    }
                }
                Some("thinking") => {
                    if let Some(thinking) = block["thinking"].as_str() {
                        if !thinking.is_empty() {
                            parts.push(Part::Thinking(thinking.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for AnthropicModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let url = format!("{}/messages", self.base_url);

        let system = Self::extract_system_message(history);
        let messages: Vec<serde_json::Value> = history
            .iter()
            .filter_map(Self::content_to_anthropic_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": config
                .and_then(|c| c.max_output_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS)
        });

        if let Some(sys) = system {
            body["system"] = json!(sys);
        }

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if let Some(top_k) = cfg.top_k {
                body["top_k"] = json!(top_k);
            }
        }

        log::debug!(
            "Anthropic request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ModelError::api("anthropic", format!("{}: {}", status, text)));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("Anthropic response: {}", resp_json);

        Self::parse_anthropic_response(&resp_json)
    }
}
