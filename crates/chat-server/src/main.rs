//! ollama-chat HTTP Server
//!
//! Axum-based server providing the REST API, the WebSocket stream and the
//! compiled web front-end.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::{get, patch, post}, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_core::{ChatService, ToolRegistry, TurnExecutorBuilder};
use chat_runtime::OllamaProvider;
use chat_store::SqliteChatStore;
use chat_tools::{register_builtin_tools, ToolsConfig};

use crate::config::ServerConfig;
use crate::handlers::{
    chat_handler, chat_messages, chat_stream_handler, create_chat, health_check, list_chats,
    list_models, rename_chat,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    // Initialize LLM provider
    let provider = Arc::new(OllamaProvider::from_env()?);
    tracing::info!("Ollama at {}", provider.config().base_url());

    // Initialize tools
    let mut tools = ToolRegistry::new();
    if config.enable_tools {
        register_builtin_tools(&mut tools, &ToolsConfig::from_env()?)?;
    } else {
        tracing::info!("Tool calling disabled");
    }

    let executor = TurnExecutorBuilder::new()
        .provider(provider.clone())
        .tools(tools)
        .use_tools(config.enable_tools)
        .max_turns(config.max_tool_turns)
        .unknown_tool_policy(config.unknown_tool_policy);
    let executor = match config.system_prompt.clone() {
        Some(prompt) => executor.system_prompt(prompt),
        None => executor,
    }
    .build()?;

    // Open chat storage
    let store = SqliteChatStore::open(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    let service = Arc::new(ChatService::new(
        executor,
        Arc::new(store),
        config.default_model.clone(),
    ));

    // Verify Ollama connection and seed the capability table
    match service.init().await {
        Ok(models) => {
            tracing::info!("✓ Connected to Ollama");
            for model in models {
                tracing::info!("  Model: {}", model.id);
            }
        }
        Err(e) => {
            tracing::warn!("⚠ Ollama not available: {}", e);
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let state = AppState { service };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))

        // Chats
        .route("/api/chats", get(list_chats).post(create_chat))
        .route("/api/chats/{id}", patch(rename_chat))
        .route("/api/chats/{id}/messages", get(chat_messages))

        // Prompting
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", get(chat_stream_handler))

        // Static files (WASM frontend)
        .fallback_service(ServeDir::new(&config.static_dir))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 ollama-chat server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET   /health                   - Health check");
    tracing::info!("  GET   /api/models               - Models and tool support");
    tracing::info!("  GET   /api/chats                - List chats");
    tracing::info!("  POST  /api/chats                - Create chat");
    tracing::info!("  PATCH /api/chats/{{id}}           - Rename chat");
    tracing::info!("  GET   /api/chats/{{id}}/messages  - Chat history");
    tracing::info!("  POST  /api/chat                 - Send prompt");
    tracing::info!("  GET   /api/chat/stream          - WebSocket streaming");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
