//! Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Chat not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for chat_core::ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => chat_core::ChatError::SessionNotFound(id),
            other => chat_core::ChatError::Storage(other.to_string()),
        }
    }
}
