//! # chat-tools
//!
//! Built-in tools the model may call during a chat exchange.
//!
//! | Tool                | Backend                         | Arguments                  |
//! |---------------------|---------------------------------|----------------------------|
//! | `search_duckduckgo` | DuckDuckGo Instant Answer API   | `query`, `result_count?`   |
//! | `lookup_wikipedia`  | MediaWiki action API            | `name`                     |
//!
//! Each tool answers with a one-line summary for the UI plus a JSON payload
//! for the model. Failures never abort the exchange; they come back as an
//! `Error: ...` payload so the model can recover.

pub mod builtin;
pub mod config;
pub mod error;
pub mod model;
pub mod svckit;

pub use builtin::{register_builtin_tools, BuiltinTool};
pub use config::ToolsConfig;
pub use error::{Result, ToolError};
pub use model::SearchResult;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{DuckDuckGoSearchTool, WikipediaLookupTool};
}
