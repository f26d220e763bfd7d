//! API Client

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Chat message as returned by the server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub chain_of_reason: Option<String>,
}

impl ChatMessage {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Reasoning worth showing, if any
    pub fn reasoning(&self) -> Option<&str> {
        self.chain_of_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    /// One-line summary of a tool message
    pub fn tool_summary(&self) -> String {
        serde_json::from_str::<ToolPayload>(self.text())
            .map(|payload| payload.message)
            .unwrap_or_else(|_| "Used a tool".into())
    }

    /// Stable-enough key that still changes while a message streams in
    pub fn render_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.created.timestamp_micros(),
            self.role,
            self.text().len(),
            self.chain_of_reason.as_deref().map_or(0, str::len)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ToolPayload {
    message: String,
}

/// Chat as listed in the sidebar
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub model: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelStatus {
    pub id: String,
    pub family: String,
    pub supports_tools: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// The server's default model if listed, else the first one
pub fn preferred_model(models: &[ModelStatus]) -> Option<&ModelStatus> {
    models.iter().find(|m| m.is_default).or_else(|| models.first())
}

/// Body of a prompt, sent over the socket
#[derive(Clone, Debug, Serialize)]
pub struct PromptPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Frames received from the streaming socket
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Chat { chat: ChatSummary },
    Snapshot { messages: Vec<ChatMessage> },
    Done { chat: ChatSummary, stop: String },
    Error {
        error: String,
        #[serde(default)]
        code: String,
        #[serde(default)]
        retryable: bool,
    },
}

fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

fn api_url(path: &str) -> String {
    format!("{}{}", origin(), path)
}

/// `http(s)://host` to `ws(s)://host`
fn websocket_origin(origin: &str) -> String {
    if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        origin.to_string()
    }
}

pub fn websocket_url(path: &str) -> String {
    format!("{}{}", websocket_origin(&origin()), path)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        let data: serde_json::Value = response.json().await.unwrap_or_default();
        Err(data["error"].as_str().unwrap_or("Request failed").to_string())
    }
}

async fn get_json<T: DeserializeOwned>(path: &str) -> Result<T, String> {
    let response = reqwest::Client::new()
        .get(api_url(path))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    read_json(response).await
}

pub async fn list_models() -> Result<Vec<ModelStatus>, String> {
    get_json("/api/models").await
}

pub async fn list_chats() -> Result<Vec<ChatSummary>, String> {
    get_json("/api/chats").await
}

pub async fn load_messages(chat_id: &str) -> Result<Vec<ChatMessage>, String> {
    get_json(&format!("/api/chats/{}/messages", chat_id)).await
}

pub async fn rename_chat(chat_id: &str, title: &str) -> Result<ChatSummary, String> {
    let response = reqwest::Client::new()
        .patch(api_url(&format!("/api/chats/{}", chat_id)))
        .json(&serde_json::json!({ "title": title }))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    read_json(response).await
}
