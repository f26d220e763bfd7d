//! # chat-core
//!
//! Chat logic for locally hosted models: streaming response reduction,
//! tool calling and persistence-agnostic chat sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        ChatService                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │ TurnExecutor │──│ StreamReducer│──│   ToolRegistry      │  │
//! │  │ (+ fallback) │  │ (think/answer│  └─────────────────────┘  │
//! │  └──────┬───────┘  │  demux)      │  ┌─────────────────────┐  │
//! │         │          └──────┬───────┘  │  ChatStore          │  │
//! │  ┌──────┴────────┐ ┌──────┴───────┐  │  (Strategy)         │  │
//! │  │ ChatProvider  │ │ LiveConver-  │  └─────────────────────┘  │
//! │  │ (Strategy)    │ │ sation       │                           │
//! │  └───────────────┘ └──────────────┘                           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ChatProvider` and `ChatStore` are the seams: the Ollama client and the
//! SQLite store live in their own crates.

pub mod capability;
pub mod error;
pub mod executor;
pub mod live;
pub mod message;
pub mod provider;
pub mod reducer;
pub mod service;
pub mod session;
pub mod tool;

#[cfg(test)]
mod testing;

pub use capability::{CapabilityTable, ToolSupport};
pub use error::{ChatError, Result};
pub use executor::{Exchange, ExchangeStop, ExecutorConfig, TurnExecutor, TurnExecutorBuilder};
pub use live::LiveConversation;
pub use message::{Message, Role};
pub use provider::{ChatChunk, ChatProvider, ChatRequest, ChunkStream, DoneReason, ModelInfo};
pub use reducer::{StreamReducer, TurnEnd, TurnOutput, UnknownToolPolicy};
pub use service::{ChatService, ModelStatus, PromptOutcome, PromptRequest};
pub use session::{ChatId, ChatSession, ChatStore, MemoryChatStore};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
