//! Conversation Messages
//!
//! Message format shared by the reducer, the store and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions (never persisted)
    System,
    /// User input
    User,
    /// Assistant (model) response
    Assistant,
    /// Tool result fed back to the model
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a chat
///
/// Only assistant messages carry a `chain_of_reason`; the constructors
/// below are the only way the crate builds messages, which keeps that true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Creation time, fixed when the message first appears
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,

    /// Text content
    #[serde(default)]
    pub content: Option<String>,

    /// Reasoning text streamed between think sentinels
    #[serde(default)]
    pub chain_of_reason: Option<String>,
}

impl Message {
    fn new(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            created: Utc::now(),
            content,
            chain_of_reason: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, Some(content.into()))
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, Some(content.into()))
    }

    /// Create an assistant message
    pub fn assistant(
        created: DateTime<Utc>,
        content: Option<String>,
        chain_of_reason: Option<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            created,
            content,
            chain_of_reason,
        }
    }

    /// Create a tool result message from its serialized payload
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, Some(content.into()))
    }

    /// Content as a borrowed str, empty when absent
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn is_tool(&self) -> bool {
        self.role == Role::Tool
    }
}
