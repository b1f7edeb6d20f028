//! Error types for the language-model collaborator clients

/// Result type for collaborator operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type covering configuration, transport, and response failures for
/// both the embedding and chat-completion collaborators.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Error when client configuration is invalid or incomplete
    #[error("Invalid provider configuration: {message}")]
    InvalidConfig { message: String },

    /// Transport-level failure talking to the provider
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status from the provider
    #[error("Provider returned {status} from {endpoint}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response that parsed but did not carry the expected payload
    #[error("Malformed provider response: {message}")]
    MalformedResponse { message: String },
}

impl LlmError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a malformed response error with a custom message.
    pub fn malformed_response<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Whether a retry may succeed: transport failures and server-side or
    /// rate-limit statuses are transient, everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http { .. } => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
