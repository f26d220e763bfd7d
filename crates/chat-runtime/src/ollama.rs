//! Ollama Chat Provider
//!
//! Streams `/api/chat` as newline-delimited JSON with tool schemas attached
//! when requested. `ollama-rs` does not expose raw function definitions on
//! its chat request, so the chat call goes through `reqwest` directly while
//! model discovery uses the `ollama-rs` client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chat_core::{
    error::{ChatError, Result},
    message::Message,
    provider::{ChatChunk, ChatProvider, ChatRequest, ChunkStream, DoneReason, ModelInfo},
    tool::{ToolCall, ToolSchema},
};
use futures::{Stream, StreamExt};
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 30,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let timeout_secs = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            host,
            port,
            timeout_secs,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }
}

/// Ollama inference provider
pub struct OllamaProvider {
    client: Ollama,
    http: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        // No overall timeout: generations stream for as long as they take
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client: Ollama::new(&config.host, config.port),
            http,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Result<Self> {
        Self::from_config(OllamaConfig::default())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Convert chat messages to Ollama format
    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.text().to_string()),
                tool_calls: None,
            })
            .collect()
    }

    fn build_request(request: &ChatRequest) -> OllamaChatRequest {
        OllamaChatRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages),
            stream: true,
            tools: request
                .tools
                .as_ref()
                .map(|tools| tools.iter().map(ToolSchema::to_function_definition).collect()),
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.config.base_url());
        let body = Self::build_request(&request);

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                ChatError::ProviderUnavailable(e.to_string())
            } else {
                ChatError::Provider(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::debug!(%status, model = %request.model, body = %text, "Ollama rejected chat request");
            return Err(rejection_error(status, text));
        }

        Ok(Box::pin(decode_chunks(Box::pin(response.bytes_stream()))))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| ChatError::ProviderUnavailable(e.to_string()))?;

        Ok(models.into_iter().map(|m| ModelInfo::new(m.name)).collect())
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Ollama wire types

#[derive(Debug, Clone, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done_reason: Option<DoneReason>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

/// Classify a non-success response; the body is usually `{"error": "..."}`
fn rejection_error(status: reqwest::StatusCode, body: String) -> ChatError {
    let message = serde_json::from_str::<OllamaErrorBody>(&body)
        .map(|body| body.error)
        .unwrap_or(body);
    ChatError::from_provider_message(format!("{} ({})", message, status))
}

/// Parse one NDJSON line of a chat stream
fn parse_line(line: &str) -> Result<ChatChunk> {
    let response: OllamaChatResponse = serde_json::from_str(line)
        .map_err(|e| ChatError::MalformedChunk(format!("{}: {}", e, line)))?;

    if let Some(error) = response.error {
        return Err(ChatError::from_provider_message(error));
    }

    let (delta, tool_calls) = match response.message {
        Some(message) => (
            message.content,
            message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCall::new(tc.function.name, tc.function.arguments))
                .collect(),
        ),
        None => (None, Vec::new()),
    };

    Ok(ChatChunk {
        delta,
        tool_calls,
        done_reason: response.done_reason,
    })
}

struct LineDecoder<S> {
    inner: S,
    buffer: Vec<u8>,
    finished: bool,
}

impl<S> LineDecoder<S> {
    /// Pop the next complete line out of the buffer
    fn next_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned())
    }

    fn take_rest(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Turn a byte stream of NDJSON into chat chunks
fn decode_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatChunk>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let decoder = LineDecoder {
        inner: bytes,
        buffer: Vec::new(),
        finished: false,
    };

    futures::stream::unfold(decoder, |mut decoder| async move {
        loop {
            let line = match decoder.next_line() {
                Some(line) => Some(line),
                None if decoder.finished => match decoder.take_rest() {
                    Some(rest) => Some(rest),
                    None => return None,
                },
                None => None,
            };

            if let Some(line) = line {
                if line.trim().is_empty() {
                    continue;
                }
                return Some((parse_line(line.trim()), decoder));
            }

            match decoder.inner.next().await {
                Some(Ok(bytes)) => decoder.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    decoder.finished = true;
                    decoder.buffer.clear();
                    return Some((Err(ChatError::Provider(e.to_string())), decoder));
                }
                None => decoder.finished = true,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::tool::ParameterSchema;

    fn byte_stream(parts: Vec<&'static str>) -> impl Stream<Item = std::result::Result<Vec<u8>, String>> + Unpin + Send {
        futures::stream::iter(parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())))
    }

    #[test]
    fn test_rejection_error_body() {
        let err = rejection_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":"registry.ollama.ai/library/gemma:2b does not support tools"}"#.into(),
        );
        match err {
            ChatError::ToolsUnsupported(message) => {
                assert_eq!(
                    message,
                    "registry.ollama.ai/library/gemma:2b does not support tools (400 Bad Request)"
                );
            }
            other => panic!("expected ToolsUnsupported, got {:?}", other),
        }

        let err = rejection_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"model 'nope' not found"}"#.into(),
        );
        assert!(matches!(err, ChatError::Provider(ref m) if m == "model 'nope' not found (404 Not Found)"));

        let err = rejection_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down".into());
        assert!(matches!(err, ChatError::Provider(ref m) if m == "upstream down (502 Bad Gateway)"));
    }

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_request_body() {
        let request = ChatRequest::new(
            "deepseek-r1:8b",
            vec![Message::user("Hello"), Message::tool(r#"{"message":"m","content":[]}"#)],
        )
        .with_tools(vec![ToolSchema {
            name: "lookup_wikipedia".into(),
            description: "Look up an article on Wikipedia.".into(),
            parameters: vec![ParameterSchema::required("name", "string", "Article name")],
        }]);

        let body = serde_json::to_value(OllamaProvider::build_request(&request)).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["tools"][0]["function"]["name"], "lookup_wikipedia");
        assert!(body["messages"][0].get("tool_calls").is_none());

        let body = serde_json::to_value(OllamaProvider::build_request(&ChatRequest::new("m", vec![]))).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_text_and_tool_lines() {
        let chunk = parse_line(r#"{"model":"m","message":{"role":"assistant","content":"<think>"},"done":false}"#).unwrap();
        assert_eq!(chunk.delta.as_deref(), Some("<think>"));
        assert!(chunk.tool_calls.is_empty());

        let chunk = parse_line(
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"lookup_wikipedia","arguments":{"name":"Rust"}}}]},"done":false}"#,
        )
        .unwrap();
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].arguments["name"], "Rust");

        let chunk = parse_line(r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#).unwrap();
        assert!(chunk.is_stop());
    }

    #[test]
    fn test_parse_error_line() {
        let err = parse_line(r#"{"error":"llama2 does not support tools"}"#).unwrap_err();
        assert!(matches!(err, ChatError::ToolsUnsupported(_)));
        assert!(matches!(parse_line("not json"), Err(ChatError::MalformedChunk(_))));
    }

    #[tokio::test]
    async fn test_decoder_handles_split_lines() {
        let stream = byte_stream(vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Pa\"}}\n{\"message\":{\"role\":\"assis",
            "tant\",\"content\":\"ris\"}}\n\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done_reason\":\"stop\"}",
        ]);
        let chunks: Vec<_> = decode_chunks(stream).collect().await;

        assert_eq!(chunks.len(), 3);
        let deltas: Vec<_> = chunks
            .iter()
            .map(|c| c.as_ref().unwrap().delta.clone().unwrap())
            .collect();
        assert_eq!(deltas, vec!["Pa", "ris", ""]);
        assert!(chunks[2].as_ref().unwrap().is_stop());
    }
}
