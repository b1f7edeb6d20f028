//! Configuration for the language-model collaborators

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default embedding dimensionality requested from the provider.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;

/// Configuration handed to collaborator clients at construction.
///
/// This is the process-wide configuration made explicit: instead of a
/// module-level API key and base URL read at import time, callers build one
/// `LlmConfig` (usually via [`LlmConfig::from_env`]) and pass it to each
/// provider they construct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API (e.g. "https://api.openai.com/v1").
    pub base_url: String,
    /// Model used for chat completions.
    pub chat_model: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Embedding dimensionality requested from the provider.
    pub embedding_dimensions: usize,
    /// Maximum tokens per chat completion, if limited.
    pub max_tokens: Option<u32>,
    /// Sampling temperature for chat completions.
    pub temperature: Option<f32>,
    /// Number of retries for transient failures.
    pub max_retries: u32,
    /// Per-request timeout.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            max_tokens: None,
            temperature: None,
            max_retries: 3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    /// Create a configuration for a given endpoint and key.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Read configuration from the environment once, at startup.
    ///
    /// `OPENAI_API_KEY` and `OPENAI_API_BASE` are required; `MODEL`,
    /// `EMBEDDING_MODEL`, `MAX_TOKENS`, and `TEMPERATURE` override defaults
    /// when present.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::invalid_config("OPENAI_API_KEY is not set"))?;
        let base_url = std::env::var("OPENAI_API_BASE")
            .map_err(|_| LlmError::invalid_config("OPENAI_API_BASE is not set"))?;

        let mut config = Self::new(api_key, base_url);
        if let Ok(model) = std::env::var("MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(max_tokens) = std::env::var("MAX_TOKENS") {
            config.max_tokens = Some(max_tokens.parse().map_err(|_| {
                LlmError::invalid_config(format!("MAX_TOKENS is not an integer: {max_tokens}"))
            })?);
        }
        if let Ok(temperature) = std::env::var("TEMPERATURE") {
            config.temperature = Some(temperature.parse().map_err(|_| {
                LlmError::invalid_config(format!("TEMPERATURE is not a number: {temperature}"))
            })?);
        }
        Ok(config)
    }

    /// Set the chat model (builder style)
    pub fn with_chat_model(self, chat_model: impl Into<String>) -> Self {
        Self {
            chat_model: chat_model.into(),
            ..self
        }
    }

    /// Set the embedding model (builder style)
    pub fn with_embedding_model(self, embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            ..self
        }
    }

    /// Set the embedding dimensionality (builder style)
    pub fn with_embedding_dimensions(self, embedding_dimensions: usize) -> Self {
        Self {
            embedding_dimensions,
            ..self
        }
    }

    /// Set the retry budget for transient failures (builder style)
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Set the per-request timeout (builder style)
    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Validate that the configuration is usable for HTTP calls.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(LlmError::invalid_config("api_key is empty"));
        }
        if self.base_url.is_empty() {
            return Err(LlmError::invalid_config("base_url is empty"));
        }
        if self.embedding_dimensions == 0 {
            return Err(LlmError::invalid_config(
                "embedding_dimensions must be greater than zero",
            ));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LlmConfig::new("key", "https://example.com/v1/");
        assert_eq!(config.base_url, "https://example.com/v1");
        assert_eq!(config.embedding_dimensions, DEFAULT_EMBEDDING_DIMENSIONS);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_methods() {
        let config = LlmConfig::new("key", "https://example.com/v1")
            .with_chat_model("gpt-4o-mini")
            .with_embedding_model("text-embedding-3-small")
            .with_embedding_dimensions(256)
            .with_max_retries(1);

        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.embedding_dimensions, 256);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_config_validation() {
        let config = LlmConfig::new("", "https://example.com/v1");
        assert!(matches!(
            config.validate(),
            Err(LlmError::InvalidConfig { .. })
        ));

        let config = LlmConfig::new("key", "https://example.com/v1").with_embedding_dimensions(0);
        assert!(matches!(
            config.validate(),
            Err(LlmError::InvalidConfig { .. })
        ));
    }
}
