//! Turn Executor
//!
//! Drives one exchange: a model turn, then another turn for as long as the
//! previous one ended in tool results. Tools are advertised only to models
//! that have not rejected them; a rejection downgrades the model in the
//! [`CapabilityTable`] and the turn is retried once without tools.

use std::sync::Arc;

use crate::capability::CapabilityTable;
use crate::error::{ChatError, Result};
use crate::live::LiveConversation;
use crate::message::{Message, Role};
use crate::provider::{ChatProvider, ChatRequest};
use crate::reducer::{StreamReducer, TurnOutput, UnknownToolPolicy};
use crate::tool::ToolRegistry;

/// Executor configuration
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Global opt-in for advertising tools
    pub use_tools: bool,

    /// Maximum model turns per exchange
    pub max_turns: usize,

    /// Handling of calls to unregistered tools
    pub unknown_tool: UnknownToolPolicy,

    /// Optional system prompt sent ahead of the chat history
    pub system_prompt: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            use_tools: true,
            max_turns: 8,
            unknown_tool: UnknownToolPolicy::default(),
            system_prompt: None,
        }
    }
}

/// Why an exchange stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStop {
    /// The last turn produced an assistant answer
    Completed,
    /// The model kept calling tools until `max_turns` ran out
    TurnLimitReached,
}

/// Everything one user prompt produced
#[derive(Clone, Debug)]
pub struct Exchange {
    /// Produced messages in causal order (tool results and answers)
    pub messages: Vec<Message>,
    /// Model turns issued, retries not counted
    pub turns: usize,
    pub stop: ExchangeStop,
}

/// Runs model turns against a provider
pub struct TurnExecutor {
    provider: Arc<dyn ChatProvider>,
    tools: Arc<ToolRegistry>,
    capabilities: Arc<CapabilityTable>,
    config: ExecutorConfig,
}

impl TurnExecutor {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        tools: Arc<ToolRegistry>,
        capabilities: Arc<CapabilityTable>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            capabilities,
            config,
        }
    }

    /// Run turns until the model answers or the turn limit is hit
    ///
    /// `history` must already end with the new user message.
    pub async fn run_exchange(
        &self,
        model: &str,
        history: &[Message],
        live: &LiveConversation,
    ) -> Result<Exchange> {
        let mut conversation = self.base_conversation(history);
        let mut produced = Vec::new();

        for turn in 1..=self.config.max_turns {
            let output = self.run_turn(model, &conversation, live).await?;
            let follow_up = output.needs_follow_up();

            conversation.extend(output.messages.iter().cloned());
            produced.extend(output.messages);

            if !follow_up {
                return Ok(Exchange {
                    messages: produced,
                    turns: turn,
                    stop: ExchangeStop::Completed,
                });
            }
            tracing::debug!(model, turn, "Tool results produced, continuing");
        }

        tracing::warn!(model, max_turns = self.config.max_turns, "Turn limit reached");
        Ok(Exchange {
            messages: produced,
            turns: self.config.max_turns,
            stop: ExchangeStop::TurnLimitReached,
        })
    }

    /// Issue a single turn, with the tool-rejection fallback
    pub async fn run_turn(
        &self,
        model: &str,
        conversation: &[Message],
        live: &LiveConversation,
    ) -> Result<TurnOutput> {
        let attach_tools = self.tools_enabled_for(model).await;
        let checkpoint = live.len();

        let mut request = ChatRequest::new(model, conversation.to_vec());
        if attach_tools {
            request = request.with_tools(self.tools.schemas());
        }

        match self.stream_turn(request.clone(), live).await {
            Err(ChatError::ToolsUnsupported(reason)) if attach_tools => {
                if self.capabilities.disable_tools(model).await {
                    tracing::info!(model, %reason, "Model rejected tools, disabling tool use");
                }
                live.truncate(checkpoint);
                request.tools = None;
                self.stream_turn(request, live).await
            }
            other => other,
        }
    }

    /// Whether the next request for `model` would carry tool schemas
    pub async fn tools_enabled_for(&self, model: &str) -> bool {
        self.config.use_tools
            && !self.tools.is_empty()
            && self.capabilities.supports_tools(model).await
    }

    async fn stream_turn(&self, request: ChatRequest, live: &LiveConversation) -> Result<TurnOutput> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.has_tools(),
            "Starting turn"
        );
        let stream = self.provider.chat_stream(request).await?;
        StreamReducer::new(&self.tools, self.config.unknown_tool, live)
            .reduce(stream)
            .await
    }

    fn base_conversation(&self, history: &[Message]) -> Vec<Message> {
        let mut conversation = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.config.system_prompt {
            if history.first().map(|m| m.role) != Some(Role::System) {
                conversation.push(Message::system(prompt.clone()));
            }
        }
        conversation.extend_from_slice(history);
        conversation
    }

    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn capabilities(&self) -> &Arc<CapabilityTable> {
        &self.capabilities
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}

/// Builder for [`TurnExecutor`]
pub struct TurnExecutorBuilder {
    provider: Option<Arc<dyn ChatProvider>>,
    tools: ToolRegistry,
    capabilities: Option<Arc<CapabilityTable>>,
    config: ExecutorConfig,
}

impl Default for TurnExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnExecutorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            capabilities: None,
            config: ExecutorConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn capabilities(mut self, capabilities: Arc<CapabilityTable>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn use_tools(mut self, enabled: bool) -> Self {
        self.config.use_tools = enabled;
        self
    }

    pub fn max_turns(mut self, max: usize) -> Self {
        self.config.max_turns = max;
        self
    }

    pub fn unknown_tool_policy(mut self, policy: UnknownToolPolicy) -> Self {
        self.config.unknown_tool = policy;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn build(self) -> Result<TurnExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| ChatError::Config("Provider is required".into()))?;
        if self.config.max_turns == 0 {
            return Err(ChatError::Config("max_turns must be at least 1".into()));
        }

        Ok(TurnExecutor::new(
            provider,
            Arc::new(self.tools),
            self.capabilities.unwrap_or_default(),
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatChunk;
    use crate::testing::{Reply, ScriptedProvider, tool_call};
    use crate::tool::ToolResult;
    use crate::tool::tests::EchoTool;

    const MODEL: &str = "deepseek-r1:8b";

    fn answer_paris() -> Reply {
        Reply::Chunks(vec![
            ChatChunk::text("<think>"),
            ChatChunk::text("ana"),
            ChatChunk::text("lyzing"),
            ChatChunk::text("</think>"),
            ChatChunk::text("Paris"),
            ChatChunk::stop(""),
        ])
    }

    fn wikipedia_call() -> Reply {
        Reply::Chunks(vec![ChatChunk::tool_calls(vec![tool_call(
            "lookup_wikipedia",
            serde_json::json!({ "name": "Rust" }),
        )])])
    }

    fn executor(provider: Arc<ScriptedProvider>, capabilities: Arc<CapabilityTable>) -> TurnExecutor {
        TurnExecutorBuilder::new()
            .provider(provider)
            .tool(EchoTool)
            .capabilities(capabilities)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_plain_answer_needs_one_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_paris()]));
        let exec = executor(provider.clone(), Arc::default());
        let live = LiveConversation::new();

        let exchange = exec
            .run_exchange(MODEL, &[Message::user("Capital of France?")], &live)
            .await
            .unwrap();

        assert_eq!(exchange.stop, ExchangeStop::Completed);
        assert_eq!(exchange.turns, 1);
        assert_eq!(exchange.messages.len(), 1);
        assert_eq!(provider.requests().len(), 1);
        assert!(provider.requests()[0].has_tools());
    }

    #[tokio::test]
    async fn test_tool_result_triggers_one_follow_up() {
        let provider = Arc::new(ScriptedProvider::new(vec![wikipedia_call(), answer_paris()]));
        let exec = executor(provider.clone(), Arc::default());
        let live = LiveConversation::new();

        let exchange = exec
            .run_exchange(MODEL, &[Message::user("Tell me about Rust")], &live)
            .await
            .unwrap();

        assert_eq!(exchange.turns, 2);
        assert_eq!(exchange.messages.len(), 2);
        assert_eq!(exchange.messages[0].role, Role::Tool);
        assert_eq!(exchange.messages[1].role, Role::Assistant);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let fed_back = requests[1].messages.last().unwrap();
        assert_eq!(fed_back.role, Role::Tool);
        let result = ToolResult::from_message(fed_back).unwrap();
        assert_eq!(result.message, "looked up Rust");
    }

    #[tokio::test]
    async fn test_tool_rejection_falls_back_without_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Reject(format!("registry.ollama.ai/library/{} does not support tools", MODEL)),
            answer_paris(),
        ]));
        let capabilities = Arc::new(CapabilityTable::new());
        capabilities.register_models([MODEL]).await;
        let exec = executor(provider.clone(), capabilities.clone());
        let live = LiveConversation::new();

        let exchange = exec
            .run_exchange(MODEL, &[Message::user("Capital of France?")], &live)
            .await
            .unwrap();

        assert!(!capabilities.supports_tools(MODEL).await);
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].has_tools());
        assert!(requests[1].tools.is_none());

        assert_eq!(exchange.messages.len(), 1);
        assert_eq!(exchange.messages[0].content.as_deref(), Some("Paris"));
        assert_eq!(exchange.messages[0].chain_of_reason.as_deref(), Some("analyzing"));
    }

    #[tokio::test]
    async fn test_in_stream_rejection_is_also_recovered() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::RejectInStream("llama2 does not support tools".into()),
            answer_paris(),
        ]));
        let exec = executor(provider.clone(), Arc::default());
        let live = LiveConversation::new();

        let exchange = exec.run_exchange("llama2", &[Message::user("hi")], &live).await.unwrap();
        assert_eq!(exchange.messages.len(), 1);
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_attempt_is_rolled_back_from_live_view() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::FailAfter(
                vec![ChatChunk::text("partial")],
                "llama2 does not support tools".into(),
            ),
            Reply::Chunks(vec![ChatChunk::stop("Paris")]),
        ]));
        let exec = executor(provider.clone(), Arc::default());
        let history = vec![Message::user("q")];
        let live = LiveConversation::with_messages(history.clone());

        let exchange = exec.run_exchange("llama2", &history, &live).await.unwrap();

        assert_eq!(exchange.messages.len(), 1);
        assert_eq!(exchange.messages[0].text(), "Paris");

        let snapshot = live.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].role, Role::User);
        assert_eq!(snapshot[1].role, Role::Assistant);
        assert_eq!(snapshot[1].text(), "Paris");
        assert!(snapshot.iter().all(|m| m.text() != "partial"));
        assert!(provider.requests()[1].tools.is_none());
    }

    #[tokio::test]
    async fn test_disabled_model_never_gets_tools_again() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_paris(), answer_paris()]));
        let capabilities = Arc::new(CapabilityTable::new());
        capabilities.disable_tools(MODEL).await;
        let exec = executor(provider.clone(), capabilities);
        let live = LiveConversation::new();

        for _ in 0..2 {
            exec.run_exchange(MODEL, &[Message::user("hi")], &live).await.unwrap();
        }
        assert!(provider.requests().iter().all(|r| r.tools.is_none()));
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::Reject("model not found".into())]));
        let exec = executor(provider.clone(), Arc::default());
        let live = LiveConversation::new();

        let result = exec.run_exchange(MODEL, &[Message::user("hi")], &live).await;
        assert!(matches!(result, Err(ChatError::Provider(_))));
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_second_rejection_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Reject("does not support tools".into()),
            Reply::Reject("does not support tools".into()),
        ]));
        let exec = executor(provider.clone(), Arc::default());
        let live = LiveConversation::new();

        let result = exec.run_exchange(MODEL, &[Message::user("hi")], &live).await;
        assert!(matches!(result, Err(ChatError::ToolsUnsupported(_))));
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_looping_model_hits_turn_limit() {
        let provider = Arc::new(ScriptedProvider::looping(10));
        let exec = TurnExecutorBuilder::new()
            .provider(provider.clone())
            .tool(EchoTool)
            .max_turns(3)
            .build()
            .unwrap();
        let live = LiveConversation::new();

        let exchange = exec.run_exchange(MODEL, &[Message::user("loop")], &live).await.unwrap();
        assert_eq!(exchange.stop, ExchangeStop::TurnLimitReached);
        assert_eq!(exchange.turns, 3);
        assert_eq!(exchange.messages.len(), 3);
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_global_toggle_and_system_prompt() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_paris()]));
        let exec = TurnExecutorBuilder::new()
            .provider(provider.clone())
            .tool(EchoTool)
            .use_tools(false)
            .system_prompt("Be brief.")
            .build()
            .unwrap();
        let live = LiveConversation::new();

        exec.run_exchange(MODEL, &[Message::user("hi")], &live).await.unwrap();
        let request = &provider.requests()[0];
        assert!(request.tools.is_none());
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages.len(), 2);
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(TurnExecutorBuilder::new().build(), Err(ChatError::Config(_))));
    }
}
