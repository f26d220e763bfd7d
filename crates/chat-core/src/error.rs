//! Error Types

use thiserror::Error;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Substring Ollama puts in the error body when a model rejects tool schemas
pub const TOOLS_UNSUPPORTED_MARKER: &str = "does not support tools";

/// Chat error types
#[derive(Error, Debug)]
pub enum ChatError {
    /// Inference provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The model rejected a request that advertised tools
    #[error("Model does not support tools: {0}")]
    ToolsUnsupported(String),

    /// Model asked for a tool that is not registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A stream chunk carried neither text nor tool calls
    #[error("Malformed stream chunk: {0}")]
    MalformedChunk(String),

    /// Chat session does not exist
    #[error("Chat not found: {0}")]
    SessionNotFound(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Request rejected before reaching the model
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Classify a raw provider error message.
    ///
    /// Ollama reports tool rejection as a plain error string, so the only
    /// signal is the message text.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(TOOLS_UNSUPPORTED_MARKER) {
            ChatError::ToolsUnsupported(message)
        } else {
            ChatError::Provider(message)
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::ProviderUnavailable(_) | ChatError::Io(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Provider(msg) => format!("The model server encountered an error: {}", msg),
            ChatError::ProviderUnavailable(_) => {
                "The model server is currently unavailable. Is Ollama running?".into()
            }
            ChatError::ToolsUnsupported(_) => "This model cannot use tools.".into(),
            ChatError::ToolNotFound(name) => format!("The model asked for an unknown tool '{}'.", name),
            ChatError::MalformedChunk(_) => "The model returned an unexpected response.".into(),
            ChatError::SessionNotFound(_) => "That chat no longer exists.".into(),
            ChatError::Storage(_) => "Could not save or load the chat history.".into(),
            ChatError::InvalidRequest(msg) => msg.clone(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_rejection_is_classified() {
        let err = ChatError::from_provider_message(
            "registry.ollama.ai/library/deepseek-r1:8b does not support tools",
        );
        assert!(matches!(err, ChatError::ToolsUnsupported(_)));

        let err = ChatError::from_provider_message("model 'nope' not found");
        assert!(matches!(err, ChatError::Provider(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(ChatError::ProviderUnavailable("down".into()).is_retryable());
        assert!(!ChatError::ToolNotFound("x".into()).is_retryable());
    }
}
