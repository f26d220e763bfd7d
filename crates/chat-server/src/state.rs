//! Application State

use std::sync::Arc;

use chat_core::ChatService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Chat service (executor + store)
    pub service: Arc<ChatService>,
}
