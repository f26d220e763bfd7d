//! # chat-store
//!
//! SQLite persistence for chats and their messages.
//!
//! ```text
//! chats(id TEXT PK, title, model, created_at)
//!   └── messages(id, chat_id FK, created, role, content, chain_of_reason)
//! ```
//!
//! Messages are read back ordered by `created`, so a batch written out of
//! order still renders in conversation order.

pub mod error;
mod migrations;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::SqliteChatStore;
