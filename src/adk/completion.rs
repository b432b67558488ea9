// SPDX-License-Identifier: MIT

//! Resilient JSON completion across several providers
//!
//! Providers are tried in preference order. Each gets `retries + 1` attempts
//! before the next one is consulted; faults are logged and swallowed. The
//! first response carrying a JSON object wins. A non-empty response without
//! one is returned as raw text so free-text callers can still use it.

use crate::adk::model::{clamp_max_tokens, Content, GenerationConfig, DEFAULT_MAX_TOKENS};
use crate::adk::registry::ModelRegistry;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Untyped key/value payload decoded from model output
pub type Payload = Map<String, Value>;

/// Default number of retries per provider
pub const DEFAULT_RETRIES: u32 = 1;

/// Outcome of a completion request
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A provider answered with a JSON object
    Json { provider: String, payload: Payload },
    /// A provider answered, but not with JSON
    Text { provider: String, text: String },
    /// Nothing usable came back; the caller's default payload
    Fallback(Payload),
}

impl Completion {
    /// Provider that produced this completion, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Completion::Json { provider, .. } | Completion::Text { provider, .. } => Some(provider),
            Completion::Fallback(_) => None,
        }
    }

    /// Structured payload (model JSON or caller fallback)
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Completion::Json { payload, .. } | Completion::Fallback(payload) => Some(payload),
            Completion::Text { .. } => None,
        }
    }

    /// Raw response text, when the provider did not answer in JSON
    pub fn text(&self) -> Option<&str> {
        match self {
            Completion::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Typed read of a payload key. Missing keys and values of the wrong
    /// type both come back as `None`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.payload()?.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Completion::Fallback(_))
    }
}

/// Chat client that asks for JSON and tolerates everything else
pub struct CompletionClient {
    registry: ModelRegistry,
    providers: Vec<String>,
    retries: u32,
    config: GenerationConfig,
}

impl CompletionClient {
    pub fn new(registry: ModelRegistry, providers: Vec<String>) -> Self {
        Self {
            registry,
            providers,
            retries: DEFAULT_RETRIES,
            config: GenerationConfig {
                max_output_tokens: Some(DEFAULT_MAX_TOKENS),
                ..Default::default()
            },
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the output token ceiling, clamped into the safe range
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_output_tokens = Some(clamp_max_tokens(max_tokens));
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Complete against the configured provider preference list
    pub async fn complete_json(&self, messages: &[Content], fallback: Option<Payload>) -> Completion {
        self.complete_json_with(messages, &self.providers, fallback)
            .await
    }

    /// Complete against an explicit provider list
    pub async fn complete_json_with(
        &self,
        messages: &[Content],
        providers: &[String],
        fallback: Option<Payload>,
    ) -> Completion {
        for provider in providers {
            let Some(model) = self.registry.get(provider).await else {
                log::warn!("Provider '{}' is not configured, skipping", provider);
                continue;
            };

            for attempt in 1..=self.retries + 1 {
                let response = match model.generate_content(messages, Some(&self.config)).await {
                    Ok(content) => content,
                    Err(e) => {
                        log::warn!(
                            "Provider {} attempt {}/{} failed: {}",
                            provider,
                            attempt,
                            self.retries + 1,
                            e
                        );
                        continue;
                    }
                };

                let text = response.text();
                if let Some(payload) = extract_json(&text) {
                    log::info!("Provider {} returned a JSON payload", provider);
                    return Completion::Json {
                        provider: provider.clone(),
                        payload,
                    };
                }

                if !text.trim().is_empty() {
                    log::info!("Provider {} returned free text", provider);
                    return Completion::Text {
                        provider: provider.clone(),
                        text,
                    };
                }

                log::warn!(
                    "Provider {} attempt {}/{} returned empty text",
                    provider,
                    attempt,
                    self.retries + 1
                );
            }
        }

        log::warn!("All providers exhausted, using fallback payload");
        Completion::Fallback(fallback.unwrap_or_default())
    }
}

/// Pull the outermost JSON object out of model text
///
/// Surrounding whitespace and code fences are tolerated, as is prose around
/// the object. Anything that is not a JSON object yields `None`.
pub fn extract_json(text: &str) -> Option<Payload> {
    let mut cleaned = text.trim();
    if cleaned.starts_with("```") {
        cleaned = cleaned.trim_matches('`');
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
