//! HTTP/WebSocket Handlers

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use chat_core::{
    ChatError, ChatId, ChatSession, ExchangeStop, LiveConversation, ModelStatus, PromptRequest,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat: ChatSession,
    pub messages: Vec<chat_core::Message>,
    pub stop: ExchangeStop,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// The same request may succeed later (e.g. once Ollama is back)
    pub retryable: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    pub title: String,
}

/// Frames sent over the streaming socket
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Chat { chat: ChatSession },
    Snapshot { messages: Vec<chat_core::Message> },
    Done { chat: ChatSession, stop: ExchangeStop },
    Error { error: String, code: String, retryable: bool },
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_and_code(err: &ChatError) -> (StatusCode, &'static str) {
    match err {
        ChatError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "CHAT_NOT_FOUND"),
        ChatError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        ChatError::ProviderUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE"),
        ChatError::Provider(_) | ChatError::ToolsUnsupported(_) | ChatError::MalformedChunk(_) => {
            (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
        }
        ChatError::ToolNotFound(_) => (StatusCode::BAD_GATEWAY, "TOOL_NOT_FOUND"),
        ChatError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

fn api_error(err: ChatError) -> ApiError {
    let (status, code) = status_and_code(&err);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
            retryable: err.is_retryable(),
        }),
    )
}

fn parse_chat_id(raw: &str) -> Result<ChatId, ApiError> {
    raw.parse().map_err(api_error)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state
        .service
        .executor()
        .provider()
        .health_check()
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
    })
}

/// Models with their current tool support
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Vec<ModelStatus>> {
    state.service.models().await.map(Json).map_err(api_error)
}

pub async fn list_chats(State(state): State<AppState>) -> ApiResult<Vec<ChatSession>> {
    state.service.sessions().await.map(Json).map_err(api_error)
}

pub async fn create_chat(
    State(state): State<AppState>,
    payload: Option<Json<CreateChatRequest>>,
) -> Result<(StatusCode, Json<ChatSession>), ApiError> {
    let model = payload.and_then(|Json(p)| p.model);
    let chat = state
        .service
        .create_session(model.as_deref())
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(chat)))
}

pub async fn rename_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RenameChatRequest>,
) -> ApiResult<ChatSession> {
    let id = parse_chat_id(&id)?;
    state
        .service
        .rename(&id, &payload.title)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn chat_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<chat_core::Message>> {
    let id = parse_chat_id(&id)?;
    state.service.messages(&id).await.map(Json).map_err(api_error)
}

/// Main chat endpoint (non-streaming)
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<PromptRequest>,
) -> ApiResult<ChatResponse> {
    let live = LiveConversation::new();
    let outcome = state.service.prompt(payload, &live).await.map_err(api_error)?;

    Ok(Json(ChatResponse {
        chat: outcome.chat,
        messages: live.snapshot(),
        stop: outcome.exchange.stop,
    }))
}

/// WebSocket streaming chat
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn send_event<S>(sender: &mut S, event: &StreamEvent) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    let Ok(text) = serde_json::to_string(event) else {
        return false;
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

fn error_event(err: ChatError) -> StreamEvent {
    let (_, code) = status_and_code(&err);
    tracing::warn!("Streaming exchange failed: {}", err);
    StreamEvent::Error {
        error: err.user_message(),
        code: code.into(),
        retryable: err.is_retryable(),
    }
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        // Parse request
        let mut request: PromptRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                let event = error_event(ChatError::InvalidRequest(e.to_string()));
                if !send_event(&mut sender, &event).await {
                    break;
                }
                continue;
            }
        };

        // Resolve the chat up front so the client can show it immediately
        let chat = match request.chat_id {
            Some(id) => state.service.session(&id).await,
            None => state.service.create_session(request.model.as_deref()).await,
        };
        let chat = match chat {
            Ok(chat) => chat,
            Err(e) => {
                if !send_event(&mut sender, &error_event(e)).await {
                    break;
                }
                continue;
            }
        };
        request.chat_id = Some(chat.id);
        if !send_event(&mut sender, &StreamEvent::Chat { chat }).await {
            break;
        }

        let live = LiveConversation::new();
        let mut updates = live.subscribe();
        let run = state.service.prompt(request, &live);
        tokio::pin!(run);

        let mut connected = true;
        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                changed = updates.changed(), if connected => {
                    if changed.is_err() {
                        connected = false;
                        continue;
                    }
                    let messages = updates.borrow_and_update().clone();
                    connected = send_event(&mut sender, &StreamEvent::Snapshot { messages }).await;
                }
            }
        };

        if !connected {
            tracing::debug!("Client went away during exchange");
            break;
        }

        let final_event = match result {
            Ok(outcome) => {
                let messages = live.snapshot();
                if !send_event(&mut sender, &StreamEvent::Snapshot { messages }).await {
                    break;
                }
                StreamEvent::Done {
                    chat: outcome.chat,
                    stop: outcome.exchange.stop,
                }
            }
            Err(e) => error_event(e),
        };
        if !send_event(&mut sender, &final_event).await {
            break;
        }
    }
}
