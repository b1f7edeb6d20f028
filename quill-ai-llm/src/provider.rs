//! Collaborator provider traits and the OpenAI-compatible HTTP implementation

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Behavioral instructions (used during extraction).
    System,
    /// The grounding prompt or user question.
    User,
    /// Prior model output, for multi-turn exchanges.
    Assistant,
}

/// One message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Trait for embedding providers that can generate vectors from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one vector per input, in
    /// input order
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_text(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Trait for chat-completion providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a conversation and return the model's text response
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for any OpenAI-compatible embedding + chat API.
///
/// Both collaborator traits are implemented on one struct, since the
/// endpoints differ only by path and payload shape. Transient failures are
/// retried with linear backoff up to the configured budget.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider from an explicit configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::invalid_config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// The configuration this provider was built with.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt = 0u32;

        loop {
            let result = self.post_json_once(&url, body).await;
            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(500 * u64::from(attempt));
                    tracing::warn!(
                        "Transient failure calling {url} (attempt {attempt}/{}): {e}; retrying in {delay:?}",
                        self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_json_once(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|source| LlmError::Http {
                endpoint: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|source| LlmError::Http {
            endpoint: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": text,
            "dimensions": self.config.embedding_dimensions,
        });

        let response = self.post_json("/embeddings", &body).await?;

        let embedding = response["data"]
            .get(0)
            .and_then(|entry| entry["embedding"].as_array())
            .ok_or_else(|| LlmError::malformed_response("no embedding in response data"))?;

        embedding
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    LlmError::malformed_response("non-numeric value in embedding array")
                })
            })
            .collect()
    }

    fn embedding_dimension(&self) -> usize {
        self.config.embedding_dimensions
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut body = json!({
            "model": self.config.chat_model,
            "messages": messages,
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }

        let response = self.post_json("/chat/completions", &body).await?;

        let content = response["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| LlmError::malformed_response("no choices in chat response"))?;

        Ok(content.trim().to_string())
    }
}
