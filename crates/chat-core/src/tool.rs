//! Tool System
//!
//! Tools are registered at startup and dispatched by name when the model
//! emits a tool call in its response stream.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ChatError, Result};
use crate::message::Message;

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: HashMap<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Deserialize the argument map into a typed argument struct
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
    }
}

/// Result from tool execution
///
/// `message` is what the UI shows; `content` is what the model reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Human-readable summary (may be markdown)
    pub message: String,

    /// Structured payload: result records, or an error string
    pub content: serde_json::Value,
}

impl ToolResult {
    pub fn new(message: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            message: message.into(),
            content,
        }
    }

    /// A failed invocation; the error is reported to the model as text
    pub fn error(message: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            message: message.into(),
            content: serde_json::Value::String(format!("Error: {}", error)),
        }
    }

    /// Wrap as a tool-role message whose content is this result as JSON
    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::tool(serde_json::to_string(self)?))
    }

    /// Recover a result from a stored tool message
    pub fn from_message(message: &Message) -> Option<Self> {
        serde_json::from_str(message.content.as_deref()?).ok()
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, integer, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Tool definition schema (for model function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render the `{"type": "function", ...}` definition Ollama expects
    pub fn to_function_definition(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.param_type,
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

/// Tool trait - implement to add new capabilities
///
/// Implementations must not fail: errors are reported back to the model as
/// a [`ToolResult`] built with [`ToolResult::error`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for model function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> ToolResult;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> std::result::Result<(), String> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(format!("Missing required parameter: {}", param.name));
            }
        }

        Ok(())
    }
}

/// Registry for available tools
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        if self.tools.insert(schema.name.clone(), tool).is_some() {
            tracing::warn!(tool = %schema.name, "Replaced previously registered tool");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Dispatch a tool call
    ///
    /// An unknown name is an error; invalid arguments are reported back to
    /// the model as a failed result.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ChatError::ToolNotFound(call.name.clone()))?;

        if let Err(reason) = tool.validate(call) {
            tracing::debug!(tool = %call.name, %reason, "Tool call rejected");
            return Ok(ToolResult::error(
                format!("Called '{}' with invalid arguments", call.name),
                reason,
            ));
        }

        Ok(tool.execute(call).await)
    }

    /// All tool schemas, sorted by name so requests are stable
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
