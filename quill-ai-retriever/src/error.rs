//! Error taxonomy for the document-QA pipeline.
//!
//! Each variant carries its recovery policy: extraction problems are
//! recovered locally during flattening and only surface here when a whole
//! file is unreadable; embedding failures during a build are fatal to the
//! build so no knowledge base ships with missing vectors; generation
//! failures never appear as this error at all — they are folded into
//! [`crate::synthesis::AnswerOutcome`] so batch jobs keep progressing.

use quill_ai_context::ContextError;
use quill_ai_llm::LlmError;

/// Result type used throughout the retriever crate.
pub type Result<T> = std::result::Result<T, RetrieverError>;

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Malformed extractor output that could not be recovered locally.
    #[error("Extraction failed: {message}")]
    Extraction { message: String },

    /// Embedding collaborator failure during a knowledge-base build or a
    /// query; fatal to the build, or to the single query, respectively.
    #[error("Embedding collaborator failed: {source}")]
    Embedding {
        #[source]
        source: LlmError,
    },

    /// Chat collaborator failure that escaped the answer-level recovery.
    #[error("Generation collaborator failed: {source}")]
    Generation {
        #[source]
        source: LlmError,
    },

    /// Invalid parameters, detected before any document is processed.
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// A persisted knowledge base that failed schema validation on load.
    #[error("Corrupt knowledge base: {message}")]
    CorruptKnowledgeBase { message: String },

    /// Query embedding dimensionality disagrees with the knowledge base.
    #[error("Embedding dimension mismatch: knowledge base has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl RetrieverError {
    pub fn corrupt_knowledge_base<S: Into<String>>(message: S) -> Self {
        Self::CorruptKnowledgeBase {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn embedding(source: LlmError) -> Self {
        Self::Embedding { source }
    }

    pub fn generation(source: LlmError) -> Self {
        Self::Generation { source }
    }
}

impl From<ContextError> for RetrieverError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::InvalidConfiguration { message } => Self::Configuration { message },
            ContextError::MalformedExtraction { message } => Self::Extraction { message },
        }
    }
}
