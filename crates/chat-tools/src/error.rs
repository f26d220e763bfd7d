//! Error Types for the built-in tools

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("No results for '{0}'")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ToolError> for chat_core::ChatError {
    fn from(err: ToolError) -> Self {
        chat_core::ChatError::Config(err.to_string())
    }
}
