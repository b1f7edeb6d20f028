//! Error types for document flattening and chunking

/// Errors produced while preparing document text for embedding.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Invalid chunking parameters, detected before any chunk is emitted.
    #[error("Invalid chunking configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Extractor output that could not be interpreted as page records.
    #[error("Malformed extraction output: {message}")]
    MalformedExtraction { message: String },
}

impl ContextError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a malformed extraction error with a custom message.
    pub fn malformed_extraction<S: Into<String>>(message: S) -> Self {
        Self::MalformedExtraction {
            message: message.into(),
        }
    }
}
