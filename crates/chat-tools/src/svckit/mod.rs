//! Service Kit - Chat Tools
//!
//! Built-in tools that implement `chat_core::Tool` for the chat service.

mod duckduckgo;
mod wikipedia;

pub use duckduckgo::{DuckDuckGoSearchTool, SearchArgs};
pub use wikipedia::{LookupArgs, WikipediaLookupTool};
