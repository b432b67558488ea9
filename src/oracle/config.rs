// SPDX-License-Identifier: MIT

//! Service settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional YAML
//! file, then `ORACLE_*` environment variables, where `__` separates nested
//! keys (`ORACLE_LLM__RETRIES=3`, `ORACLE_LLM__MODELS__GEMINI=...`).
//! Provider credentials are never stored here; each adapter reads its own key
//! from the environment.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adk::completion::{CompletionClient, DEFAULT_RETRIES};
use crate::adk::error::{OracleError, Result};
use crate::adk::model::{self, clamp_max_tokens, DEFAULT_MAX_TOKENS, DEFAULT_REQUEST_TIMEOUT};
use crate::adk::registry::ModelRegistry;
use crate::oracle::stages::DEFAULT_HISTORY_LIMIT;

/// Prefix of the environment overlay
pub const ENV_PREFIX: &str = "ORACLE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider preference order
    pub providers: Vec<String>,
    pub retries: u32,
    /// Output token ceiling; clamped when the client is built
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Per-request timeout; a call that runs over counts as a failed attempt
    pub request_timeout_secs: u64,
    /// Model name per provider, overriding the built-in default
    pub models: HashMap<String, String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            providers: vec!["gemini".to_string(), "openai".to_string()],
            retries: DEFAULT_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            models: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub db_path: PathBuf,
    /// Turns of history fed to chat replies
    pub history_limit: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("oracle_choice.db"),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Defaults, overlaid by `path` when given, overlaid by the process
    /// environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading the overlay from `env` instead of
    /// the process environment when given
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            log::info!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("llm.providers")
                .source(env),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.normalized().validated()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.normalized().validated()
    }

    fn validated(self) -> Result<Self> {
        if self.llm.request_timeout_secs == 0 {
            return Err(OracleError::config("llm.request_timeout_secs must be positive"));
        }
        Ok(self)
    }

    /// Provider names trimmed and lowercased, blanks dropped
    fn normalized(mut self) -> Self {
        self.llm.providers = self
            .llm
            .providers
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Model name for a provider: configured, else the built-in default
    pub fn model_name(&self, provider: &str) -> Option<String> {
        self.llm
            .models
            .get(provider)
            .cloned()
            .or_else(|| model::default_model_name(provider).map(str::to_string))
    }

    /// Register an adapter for every preferred provider that has
    /// credentials. The rest are logged and skipped.
    pub async fn build_registry(&self) -> ModelRegistry {
        let registry = ModelRegistry::new();
        for provider in &self.llm.providers {
            let Some(model_name) = self.model_name(provider) else {
                log::warn!("Unknown provider '{}', skipping", provider);
                continue;
            };
            match model::from_provider(provider, model_name.clone(), self.request_timeout()) {
                Ok(model) => {
                    log::info!("Enabled provider {} ({})", provider, model_name);
                    registry.register(provider.clone(), model).await;
                }
                Err(e) => log::warn!("Provider {} disabled: {}", provider, e),
            }
        }
        registry
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn completion_client(&self, registry: ModelRegistry) -> CompletionClient {
        CompletionClient::new(registry, self.llm.providers.clone())
            .with_retries(self.llm.retries)
            .with_max_tokens(clamp_max_tokens(self.llm.max_tokens))
            .with_temperature(self.llm.temperature)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(None, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.llm.providers, vec!["gemini", "openai"]);
        assert_eq!(settings.llm.retries, 1);
        assert_eq!(settings.llm.max_tokens, 512);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.storage.db_path, PathBuf::from("oracle_choice.db"));
        assert_eq!(settings.storage.history_limit, 5);
        assert_eq!(settings.bind_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn test_yaml_partial_overlay() {
        let yaml = "\
llm:
  providers: [deepseek]
  models:
    deepseek: deepseek-reasoner
server:
  port: 9000
";
        let settings = Settings::from_yaml_str(yaml).unwrap();

        assert_eq!(settings.llm.providers, vec!["deepseek"]);
        assert_eq!(settings.llm.retries, 1);
        assert_eq!(settings.model_name("deepseek").as_deref(), Some("deepseek-reasoner"));
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = yaml_file("llm:\n  retries: 2\n  max_tokens: 256\nserver:\n  port: 9000\n");

        let settings = Settings::load_with_env(
            Some(file.path()),
            env(&[
                ("ORACLE_LLM__PROVIDERS", " OpenAI, ,anthropic "),
                ("ORACLE_LLM__RETRIES", "3"),
                ("ORACLE_LLM__TEMPERATURE", "0.2"),
                ("ORACLE_LLM__REQUEST_TIMEOUT_SECS", "5"),
                ("ORACLE_LLM__MODELS__GEMINI", "gemini-2.0-flash"),
                ("ORACLE_STORAGE__DB_PATH", "/tmp/x.db"),
                ("ORACLE_SERVER__PORT", "8080"),
                ("UNRELATED_PORT", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.llm.providers, vec!["openai", "anthropic"]);
        assert_eq!(settings.llm.retries, 3);
        assert_eq!(settings.llm.max_tokens, 256);
        assert_eq!(settings.llm.temperature, Some(0.2));
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.model_name("gemini").as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(settings.storage.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_bad_number_is_settings_error() {
        let result = Settings::load_with_env(None, env(&[("ORACLE_LLM__RETRIES", "-1")]));
        assert!(matches!(result, Err(OracleError::Settings(_))));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = Settings::from_yaml_str("llm:\n  request_timeout_secs: 0\n");
        assert!(matches!(result, Err(OracleError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_settings_error() {
        let result = Settings::load_with_env(Some(Path::new("/nonexistent/oracle.yaml")), env(&[]));
        assert!(matches!(result, Err(OracleError::Settings(_))));
    }

    #[test]
    fn test_client_uses_llm_settings() {
        let mut settings = Settings::default();
        settings.llm.providers = vec![];
        settings.llm.retries = 4;
        let client = settings.completion_client(ModelRegistry::new());
        assert_eq!(client.retries(), 4);
        assert!(client.providers().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_registered() {
        let mut settings = Settings::default();
        settings.llm.providers = vec!["mystery".to_string()];
        assert!(settings.build_registry().await.providers().await.is_empty());
    }
}
