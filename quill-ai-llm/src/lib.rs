//! # quill-ai-llm
//!
//! Clients for the two language-model collaborators the document-QA pipeline
//! depends on: an embedding endpoint (`embed(text) -> vector`) and a
//! chat-completion endpoint (`complete(messages) -> text`), both spoken over
//! an OpenAI-compatible HTTP API.
//!
//! ## Design
//!
//! - **Explicit configuration**: every client is built from an [`LlmConfig`]
//!   passed in at construction. There is no module-level API key, base URL,
//!   or model name; `LlmConfig::from_env` exists for callers that want to
//!   read the environment once at startup.
//! - **Trait seams**: the pipeline consumes [`EmbeddingProvider`] and
//!   [`ChatProvider`], so tests substitute in-memory providers and the
//!   retrieval code never touches HTTP directly.
//! - **Retries**: transient HTTP failures are retried with backoff inside
//!   the provider; callers see a single [`Result`] per request.
//!
//! ## Quick Start
//!
//! ```no_run
//! use quill_ai_llm::{EmbeddingProvider, LlmConfig, OpenAiProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = LlmConfig::from_env()?;
//! let provider = OpenAiProvider::new(config)?;
//! let vector = provider.embed_text("What is the reimbursement policy?").await?;
//! println!("embedded into {} dimensions", vector.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provider;

// Re-export main types for easy access
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use provider::{ChatMessage, ChatProvider, ChatRole, EmbeddingProvider, OpenAiProvider};
