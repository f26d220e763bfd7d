//! Stream Reducer
//!
//! Folds the chunk stream of one model turn into the messages that turn
//! produced. Text between `<think>` and `</think>` goes to the assistant's
//! chain of reason, everything else to its content. A chunk carrying tool
//! calls ends the turn: the calls are executed and their results become
//! tool messages for the next turn to read.

use chrono::{DateTime, Utc};
use futures::StreamExt;

use crate::error::{ChatError, Result};
use crate::live::LiveConversation;
use crate::message::Message;
use crate::provider::ChunkStream;
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Delta that switches the stream into reasoning mode
pub const THINK_OPEN: &str = "<think>";

/// Delta that switches the stream back to answer mode
pub const THINK_CLOSE: &str = "</think>";

/// What to do when the model calls a tool that is not registered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownToolPolicy {
    /// Abort the exchange with [`ChatError::ToolNotFound`]
    Fail,
    /// Answer the call with an error result so the model can recover
    #[default]
    ReportToModel,
}

impl std::str::FromStr for UnknownToolPolicy {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "report" | "report_to_model" => Ok(Self::ReportToModel),
            other => Err(ChatError::Config(format!("unknown tool policy '{}'", other))),
        }
    }
}

/// Why a turn stopped consuming its stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnEnd {
    /// The model signalled `done_reason: stop`
    Stop,
    /// A tool-call chunk arrived
    ToolCalls,
    /// The stream ended without a terminal signal
    StreamEnded,
}

/// Messages produced by one turn, in the order they happened
#[derive(Clone, Debug)]
pub struct TurnOutput {
    pub messages: Vec<Message>,
    pub end: TurnEnd,
}

impl TurnOutput {
    /// True when the last message is a tool result the model has not seen yet
    pub fn needs_follow_up(&self) -> bool {
        self.messages.last().is_some_and(Message::is_tool)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Answer,
    Thinking,
}

/// In-progress assistant message, owned by the reducer for one turn
struct AssistantDraft {
    created: DateTime<Utc>,
    content: Option<String>,
    chain_of_reason: Option<String>,
}

impl AssistantDraft {
    fn start() -> Self {
        Self {
            created: Utc::now(),
            content: None,
            chain_of_reason: None,
        }
    }

    fn append(&mut self, mode: Mode, delta: &str) {
        let target = match mode {
            Mode::Thinking => &mut self.chain_of_reason,
            Mode::Answer => &mut self.content,
        };
        target.get_or_insert_with(String::new).push_str(delta);
    }

    fn snapshot(&self) -> Message {
        Message::assistant(
            self.created,
            self.content.clone(),
            self.chain_of_reason.clone(),
        )
    }
}

/// Consumes one turn's stream, publishing progress to the live view
pub struct StreamReducer<'a> {
    tools: &'a ToolRegistry,
    policy: UnknownToolPolicy,
    live: &'a LiveConversation,
}

impl<'a> StreamReducer<'a> {
    pub fn new(tools: &'a ToolRegistry, policy: UnknownToolPolicy, live: &'a LiveConversation) -> Self {
        Self { tools, policy, live }
    }

    /// Reduce a turn's stream into its messages
    ///
    /// Text streamed before a tool call is kept as an assistant message
    /// ahead of the tool results, so such a turn still gets a follow-up.
    pub async fn reduce(&self, mut stream: ChunkStream) -> Result<TurnOutput> {
        let mut mode = Mode::Answer;
        let mut draft: Option<AssistantDraft> = None;
        let mut messages = Vec::new();
        let mut end = TurnEnd::StreamEnded;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;

            if !chunk.tool_calls.is_empty() {
                // text streamed before the call stays ahead of the results
                if let Some(draft) = draft.take() {
                    messages.push(draft.snapshot());
                }
                for call in &chunk.tool_calls {
                    let result = self.run_tool(call).await?;
                    let message = result.to_message()?;
                    self.live.push(message.clone());
                    messages.push(message);
                }
                end = TurnEnd::ToolCalls;
                break;
            }

            let stop = chunk.is_stop();
            let delta = chunk.delta.ok_or_else(|| {
                ChatError::MalformedChunk("chunk carries neither text nor tool calls".into())
            })?;

            match delta.as_str() {
                THINK_OPEN => mode = Mode::Thinking,
                THINK_CLOSE => mode = Mode::Answer,
                "" => {}
                text => match draft.as_mut() {
                    Some(current) => {
                        current.append(mode, text);
                        self.live.replace_last(current.snapshot());
                    }
                    None => {
                        let mut started = AssistantDraft::start();
                        started.append(mode, text);
                        self.live.push(started.snapshot());
                        draft = Some(started);
                    }
                },
            }

            if stop {
                end = TurnEnd::Stop;
                break;
            }
        }

        if let Some(draft) = draft {
            messages.push(draft.snapshot());
        }

        tracing::debug!(?end, produced = messages.len(), "Turn reduced");
        Ok(TurnOutput { messages, end })
    }

    async fn run_tool(&self, call: &ToolCall) -> Result<ToolResult> {
        tracing::debug!(tool = %call.name, "Executing tool");

        match self.tools.dispatch(call).await {
            Err(ChatError::ToolNotFound(name)) if self.policy == UnknownToolPolicy::ReportToModel => {
                tracing::warn!(tool = %name, "Model called an unregistered tool");
                Ok(ToolResult::error(
                    format!("Attempted to call unknown tool '{}'", name),
                    format!(
                        "no tool named '{}' exists; available tools: {}",
                        name,
                        self.tools.names().join(", ")
                    ),
                ))
            }
            other => other,
        }
    }
}
