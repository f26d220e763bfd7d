//! Test doubles shared by the unit tests of this crate

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ChatError, Result};
use crate::provider::{ChatChunk, ChatProvider, ChatRequest, ChunkStream, ModelInfo};
use crate::tool::ToolCall;

pub(crate) fn scripted_stream(chunks: Vec<ChatChunk>) -> ChunkStream {
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}

pub(crate) fn tool_call(name: &str, args: serde_json::Value) -> ToolCall {
    let arguments = args
        .as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    ToolCall::new(name, arguments)
}

/// One scripted reply of [`ScriptedProvider`]
pub(crate) enum Reply {
    Chunks(Vec<ChatChunk>),
    /// Fail when opening the stream
    Reject(String),
    /// Fail as the first stream item
    RejectInStream(String),
    /// Stream the chunks, then fail
    FailAfter(Vec<ChatChunk>, String),
}

/// Provider that replays canned replies and records every request
pub(crate) struct ScriptedProvider {
    models: Vec<String>,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            models: vec!["deepseek-r1:8b".into(), "llama3.2".into()],
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider that answers every request with the same tool call
    pub(crate) fn looping(turns: usize) -> Self {
        let replies = (0..turns)
            .map(|_| {
                Reply::Chunks(vec![ChatChunk::tool_calls(vec![tool_call(
                    "lookup_wikipedia",
                    serde_json::json!({ "name": "Rust" }),
                )])])
            })
            .collect();
        Self::new(replies)
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Chunks(chunks)) => Ok(scripted_stream(chunks)),
            Some(Reply::Reject(message)) => Err(ChatError::from_provider_message(message)),
            Some(Reply::RejectInStream(message)) => Ok(Box::pin(futures::stream::iter(vec![Err(
                ChatError::from_provider_message(message),
            )]))),
            Some(Reply::FailAfter(chunks, message)) => {
                let items: Vec<Result<ChatChunk>> = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(ChatError::from_provider_message(message))))
                    .collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            None => Err(ChatError::Provider("script exhausted".into())),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(self.models.iter().map(ModelInfo::new).collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
