//! Chat Service
//!
//! Glue between the turn executor and the chat store: picks the model,
//! creates a chat on the first prompt, runs the exchange and persists the
//! prompt together with everything the exchange produced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::executor::{Exchange, TurnExecutor};
use crate::live::LiveConversation;
use crate::message::Message;
use crate::provider::ModelInfo;
use crate::session::{ChatId, ChatSession, ChatStore, DEFAULT_TITLE};

/// A user prompt, optionally aimed at an existing chat
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptRequest {
    pub message: String,

    /// Existing chat; a new one is created when absent
    #[serde(default)]
    pub chat_id: Option<ChatId>,

    /// Model for a new chat; ignored for existing chats
    #[serde(default)]
    pub model: Option<String>,
}

/// Result of a completed prompt
#[derive(Clone, Debug)]
pub struct PromptOutcome {
    pub chat: ChatSession,
    pub exchange: Exchange,
}

/// A model and whether it is currently offered tools
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelStatus {
    pub id: String,
    /// Name without the tag, used as the assistant's display name
    pub family: String,
    pub supports_tools: bool,
    /// The model new chats use when none is requested
    pub is_default: bool,
}

pub struct ChatService {
    executor: TurnExecutor,
    store: Arc<dyn ChatStore>,
    default_model: String,
}

impl ChatService {
    pub fn new(executor: TurnExecutor, store: Arc<dyn ChatStore>, default_model: impl Into<String>) -> Self {
        Self {
            executor,
            store,
            default_model: default_model.into(),
        }
    }

    /// Discover models and seed the capability table
    pub async fn init(&self) -> Result<Vec<ModelInfo>> {
        let models = self.executor.provider().list_models().await?;
        self.executor
            .capabilities()
            .register_models(models.iter().map(|m| m.id.clone()))
            .await;
        tracing::info!(count = models.len(), "Discovered models");
        Ok(models)
    }

    /// Available models with their tool support
    pub async fn models(&self) -> Result<Vec<ModelStatus>> {
        let models = self.executor.provider().list_models().await?;
        let mut statuses = Vec::with_capacity(models.len());
        for model in models {
            let supports_tools = self.executor.tools_enabled_for(&model.id).await;
            statuses.push(ModelStatus {
                family: model.family().to_string(),
                is_default: model.id == self.default_model(),
                id: model.id,
                supports_tools,
            });
        }
        Ok(statuses)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub async fn sessions(&self) -> Result<Vec<ChatSession>> {
        self.store.list_sessions().await
    }

    /// Start an empty chat
    pub async fn create_session(&self, model: Option<&str>) -> Result<ChatSession> {
        let model = model.unwrap_or(self.default_model());
        let chat = self
            .store
            .create_session(DEFAULT_TITLE, ChatId::new(), model)
            .await?;
        tracing::debug!(chat = %chat.id, model, "Created chat");
        Ok(chat)
    }

    pub async fn session(&self, id: &ChatId) -> Result<ChatSession> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))
    }

    pub async fn rename(&self, id: &ChatId, title: &str) -> Result<ChatSession> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::InvalidRequest("Chat title must not be empty".into()));
        }
        let mut chat = self.session(id).await?;
        self.store.update_session_title(id, title).await?;
        chat.title = title.to_string();
        Ok(chat)
    }

    pub async fn messages(&self, id: &ChatId) -> Result<Vec<Message>> {
        self.session(id).await?;
        self.store.get_messages(id).await
    }

    /// Run one prompt to completion
    ///
    /// The live view is reset to the chat's history plus the prompt, then
    /// receives every update of the exchange. Nothing is persisted if the
    /// exchange fails.
    pub async fn prompt(&self, request: PromptRequest, live: &LiveConversation) -> Result<PromptOutcome> {
        let text = request.message.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidRequest("Message must not be empty".into()));
        }

        let chat = match request.chat_id {
            Some(id) => self.session(&id).await?,
            None => self.create_session(request.model.as_deref()).await?,
        };

        let mut history = self.store.get_messages(&chat.id).await?;
        let user_message = Message::user(text);
        history.push(user_message.clone());
        live.replace_all(history.clone());

        let exchange = self.executor.run_exchange(&chat.model, &history, live).await?;

        let mut to_persist = Vec::with_capacity(exchange.messages.len() + 1);
        to_persist.push(user_message);
        to_persist.extend(exchange.messages.iter().cloned());
        self.store.create_messages(&chat.id, &to_persist).await?;

        tracing::info!(
            chat = %chat.id,
            model = %chat.model,
            turns = exchange.turns,
            stop = ?exchange.stop,
            "Exchange finished"
        );
        Ok(PromptOutcome { chat, exchange })
    }

    pub fn executor(&self) -> &TurnExecutor {
        &self.executor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExchangeStop, TurnExecutorBuilder};
    use crate::message::Role;
    use crate::provider::ChatChunk;
    use crate::session::MemoryChatStore;
    use crate::testing::{Reply, ScriptedProvider};
    use crate::tool::tests::EchoTool;

    fn service(replies: Vec<Reply>) -> (ChatService, Arc<ScriptedProvider>, Arc<MemoryChatStore>) {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let store = Arc::new(MemoryChatStore::new());
        let executor = TurnExecutorBuilder::new()
            .provider(provider.clone())
            .tool(EchoTool)
            .build()
            .unwrap();
        (
            ChatService::new(executor, store.clone(), "deepseek-r1:8b"),
            provider,
            store,
        )
    }

    fn answer(text: &str) -> Reply {
        Reply::Chunks(vec![ChatChunk::stop(text)])
    }

    #[tokio::test]
    async fn test_first_prompt_creates_chat_and_persists() {
        let (service, _provider, store) = service(vec![answer("Hello!")]);
        let live = LiveConversation::new();

        let outcome = service
            .prompt(
                PromptRequest {
                    message: "Hi".into(),
                    chat_id: None,
                    model: None,
                },
                &live,
            )
            .await
            .unwrap();

        assert_eq!(outcome.chat.title, DEFAULT_TITLE);
        assert_eq!(outcome.chat.model, "deepseek-r1:8b");

        let stored = store.get_messages(&outcome.chat.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[1].text(), "Hello!");
        assert_eq!(live.snapshot(), stored);
    }

    #[tokio::test]
    async fn test_existing_chat_keeps_its_model_and_history() {
        let (service, provider, _store) = service(vec![answer("one"), answer("two")]);
        let live = LiveConversation::new();

        let chat = service.create_session(Some("llama3.2")).await.unwrap();
        for text in ["first", "second"] {
            service
                .prompt(
                    PromptRequest {
                        message: text.into(),
                        chat_id: Some(chat.id),
                        model: Some("ignored".into()),
                    },
                    &live,
                )
                .await
                .unwrap();
        }

        let requests = provider.requests();
        assert!(requests.iter().all(|r| r.model == "llama3.2"));
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(service.messages(&chat.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_exchange_persists_nothing() {
        let (service, _provider, store) = service(vec![Reply::Reject("boom".into())]);
        let live = LiveConversation::new();
        let chat = service.create_session(None).await.unwrap();

        let result = service
            .prompt(
                PromptRequest {
                    message: "hi".into(),
                    chat_id: Some(chat.id),
                    model: None,
                },
                &live,
            )
            .await;
        assert!(result.is_err());
        assert!(store.get_messages(&chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_turn_limit_exchange_is_persisted() {
        let provider = Arc::new(ScriptedProvider::looping(5));
        let store = Arc::new(MemoryChatStore::new());
        let executor = TurnExecutorBuilder::new()
            .provider(provider.clone())
            .tool(EchoTool)
            .max_turns(2)
            .build()
            .unwrap();
        let service = ChatService::new(executor, store.clone(), "deepseek-r1:8b");
        let live = LiveConversation::new();

        let outcome = service
            .prompt(
                PromptRequest {
                    message: "keep looking".into(),
                    chat_id: None,
                    model: None,
                },
                &live,
            )
            .await
            .unwrap();

        assert_eq!(outcome.exchange.stop, ExchangeStop::TurnLimitReached);
        let stored = store.get_messages(&outcome.chat.id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].role, Role::User);
        assert!(stored[1..].iter().all(Message::is_tool));
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_init_and_rename() {
        let (service, _provider, _store) = service(vec![]);
        let models = service.init().await.unwrap();
        assert_eq!(models.len(), 2);
        let statuses = service.models().await.unwrap();
        assert!(statuses.iter().all(|m| m.supports_tools));
        assert_eq!(statuses[0].family, "deepseek-r1");
        assert!(statuses[0].is_default);
        assert_eq!(statuses[1].family, "llama3.2");
        assert!(!statuses[1].is_default);

        let chat = service.create_session(None).await.unwrap();
        let renamed = service.rename(&chat.id, "  Paris  ").await.unwrap();
        assert_eq!(renamed.title, "Paris");
        assert!(matches!(
            service.rename(&chat.id, " ").await,
            Err(ChatError::InvalidRequest(_))
        ));
    }
}
