//! Model capability table
//!
//! Tracks which models accept tool schemas. Every listed model starts out
//! enabled; a model is downgraded the first time it rejects a tool request
//! and stays downgraded for the life of the process.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Tool-calling state of one model
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolSupport {
    ToolsEnabled,
    ToolsDisabled,
}

/// Keyed tool-support store shared by all chats
#[derive(Debug, Default)]
pub struct CapabilityTable {
    models: RwLock<HashMap<String, ToolSupport>>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed entries for newly discovered models; existing entries are kept
    pub async fn register_models<I, S>(&self, models: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = self.models.write().await;
        for model in models {
            table.entry(model.into()).or_insert(ToolSupport::ToolsEnabled);
        }
    }

    /// Current state; unknown models are assumed to support tools
    pub async fn support(&self, model: &str) -> ToolSupport {
        self.models
            .read()
            .await
            .get(model)
            .copied()
            .unwrap_or(ToolSupport::ToolsEnabled)
    }

    pub async fn supports_tools(&self, model: &str) -> bool {
        self.support(model).await == ToolSupport::ToolsEnabled
    }

    /// Downgrade a model. Returns true if this call changed its state.
    pub async fn disable_tools(&self, model: &str) -> bool {
        let mut table = self.models.write().await;
        let previous = table.insert(model.to_string(), ToolSupport::ToolsDisabled);
        previous != Some(ToolSupport::ToolsDisabled)
    }
}
