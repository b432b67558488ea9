// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{http_client, Content, GenerationConfig, Model, Part};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;

/// Google Gemini model implementation
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a new GeminiModel
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    /// Optionally uses `GEMINI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String, timeout: Duration) -> Result<Self, ModelError> {
        let api_key =
            env::var("GOOGLE_API_KEY").map_err(|_| ModelError::ApiKeyMissing("gemini".into()))?;
        let base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

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

    /// Build the request body. System turns become `systemInstruction`.
    fn build_body(history: &[Content], config: Option<&GenerationConfig>) -> serde_json::Value {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for c in history {
            let parts: Vec<serde_json::Value> =
                c.parts.iter().filter_map(part_to_gemini_json).collect();
            if parts.is_empty() {
                continue;
            }
            match c.role.as_str() {
                "system" => system_parts.extend(parts),
                "model" | "assistant" => contents.push(json!({ "role": "model", "parts": parts })),
                _ => contents.push(json!({ "role": "user", "parts": parts })),
            }
        }

        let mut body = json!({ "contents": contents });

        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }

        if let Some(cfg) = config {
            let mut generation = serde_json::Map::new();
            if let Some(temp) = cfg.temperature {
                generation.insert("temperature".into(), json!(temp));
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                generation.insert("maxOutputTokens".into(), json!(max_tokens));
            }
            if let Some(top_p) = cfg.top_p {
                generation.insert("topP".into(), json!(top_p));
            }
            if let Some(top_k) = cfg.top_k {
                generation.insert("topK".into(), json!(top_k));
            }
            if !generation.is_empty() {
                body["generationConfig"] = serde_json::Value::Object(generation);
            }
        }

        body
    }
}

#[async_trait]
impl Model for GeminiModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model_name
        );

        let body = Self::build_body(history, config);

        log::debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ModelError::api("gemini", format!("{}: {}", status, text)));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("Gemini response: {}", resp_json);

        let candidate = resp_json["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No candidates in response".into()))?;

        if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            log::debug!("Gemini finish reason: {}", finish_reason);
            if finish_reason == "SAFETY" {
                return Err(ModelError::api(
                    "gemini",
                    "response blocked by safety filters",
                ));
            }
        }

        let parts_json = candidate["content"]["parts"].as_array().ok_or_else(|| {
            ModelError::InvalidResponse(format!("No parts in candidate: {}", candidate))
        })?;

        Ok(Content {
            role: "model".to_string(),
            parts: parts_json.iter().flat_map(parse_gemini_part).collect(),
        })
    }
}

/// Serialize a Part to Gemini API JSON format
/// Returns None for parts that shouldn't be sent (e.g., Thinking)
pub fn part_to_gemini_json(part: &Part) -> Option<serde_json::Value> {
    match part {
        Part::Text(t) => Some(json!({ "text": t })),
        Part::Thinking(_) => None,
    }
}

/// Parse a Gemini API JSON part into Parts
///
/// Thinking models flag reasoning parts with `"thought": true`; older
/// responses carry the reasoning as a string in `thought`.
pub fn parse_gemini_part(p: &serde_json::Value) -> Vec<Part> {
    let mut parts = Vec::new();

    if let Some(thought) = p.get("thought").and_then(|t| t.as_str()) {
        if !thought.is_empty() {
            parts.push(Part::Thinking(thought.to_string()));
        }
    }

    if let Some(text) = p["text"].as_str() {
        if p["thought"].as_bool() == Some(true) {
            parts.push(Part::Thinking(text.to_string()));
        } else {
            parts.push(Part::Text(text.to_string()));
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_text_part() {
        let part = Part::Text("Hello world".to_string());
        let json = part_to_gemini_json(&part).unwrap();
        assert_eq!(json, json!({ "text": "Hello world" }));
    }

    #[test]
    fn test_serialize_thinking_part_returns_none() {
        let part = Part::Thinking("Internal reasoning".to_string());
        assert!(part_to_gemini_json(&part).is_none());
    }

    #[test]
    fn test_parse_text_part() {
        let parts = parse_gemini_part(&json!({ "text": "Hello world" }));
        assert_eq!(parts, vec![Part::Text("Hello world".to_string())]);
    }

    #[test]
    fn test_parse_flagged_thought_part() {
        let parts = parse_gemini_part(&json!({ "text": "pondering", "thought": true }));
        assert_eq!(parts, vec![Part::Thinking("pondering".to_string())]);
    }

    #[test]
    fn test_parse_empty_thought_ignored() {
        let parts = parse_gemini_part(&json!({ "thought": "", "text": "Hello" }));
        assert_eq!(parts, vec![Part::Text("Hello".to_string())]);
    }

    #[test]
    fn test_build_body_moves_system_to_instruction() {
        let history = [
            Content::system("Classify."),
            Content::user("hi"),
            Content::model("hello"),
        ];
        let config = GenerationConfig {
            max_output_tokens: Some(512),
            ..Default::default()
        };

        let body = GeminiModel::build_body(&history, Some(&config));

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Classify.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    }
}
