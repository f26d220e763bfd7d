//! Inference Provider
//!
//! The streaming chat-completion API is consumed through [`ChatProvider`] so
//! the reducer and executor never see a concrete HTTP client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_core::provider::{ChatProvider, ChatRequest};
//!
//! let mut stream = provider.chat_stream(ChatRequest::new("deepseek-r1:8b", messages)).await?;
//! while let Some(chunk) = stream.next().await {
//!     let chunk = chunk?;
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// One streaming chat request
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Model identifier (e.g., "deepseek-r1:8b")
    pub model: String,

    /// Full conversation so far
    pub messages: Vec<Message>,

    /// Tool schemas to advertise, `None` to send a tool-less request
    pub tools: Option<Vec<ToolSchema>>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    Stop,
    Length,
    Load,
    #[serde(other)]
    Other,
}

/// A chunk from a streaming completion
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatChunk {
    /// The text delta
    pub delta: Option<String>,

    /// Tool calls requested in this chunk
    pub tool_calls: Vec<ToolCall>,

    /// Set on the final chunk of a turn
    pub done_reason: Option<DoneReason>,
}

impl ChatChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn stop(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
            tool_calls: Vec::new(),
            done_reason: Some(DoneReason::Stop),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.done_reason == Some(DoneReason::Stop)
    }
}

/// Stream type for chat streaming
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Display name without the tag ("deepseek-r1:8b" -> "deepseek-r1")
    pub fn family(&self) -> &str {
        self.id.split(':').next().unwrap_or(&self.id)
    }
}

/// Strategy trait for inference backends
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a streaming chat completion
    ///
    /// Tool rejection may surface here or as the first stream item;
    /// either way it is a [`crate::ChatError::ToolsUnsupported`].
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;
}
