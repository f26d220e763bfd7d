//! # chat-runtime
//!
//! Inference providers for ollama-chat.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference via Ollama's streaming chat API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_runtime::ollama::OllamaProvider;
//!
//! let provider = OllamaProvider::from_env()?;
//! let executor = TurnExecutorBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use chat_core::{ChatError, ChatProvider, ChatRequest, Message, Result, Role};
