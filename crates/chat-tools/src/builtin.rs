//! The closed set of built-in tools

use std::fmt;

use chat_core::ToolRegistry;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::svckit::{DuckDuckGoSearchTool, WikipediaLookupTool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    SearchDuckDuckGo,
    LookupWikipedia,
}

impl BuiltinTool {
    pub const ALL: [Self; 2] = [Self::SearchDuckDuckGo, Self::LookupWikipedia];

    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchDuckDuckGo => "search_duckduckgo",
            Self::LookupWikipedia => "lookup_wikipedia",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }
}

impl fmt::Display for BuiltinTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register the built-in tools enabled in `config` on `registry`
pub fn register_builtin_tools(registry: &mut ToolRegistry, config: &ToolsConfig) -> Result<()> {
    let http = config.http_client()?;

    for &tool in &config.enabled {
        match tool {
            BuiltinTool::SearchDuckDuckGo => {
                registry.register(DuckDuckGoSearchTool::new(http.clone(), config));
            }
            BuiltinTool::LookupWikipedia => {
                registry.register(WikipediaLookupTool::new(http.clone(), config));
            }
        }
    }

    tracing::info!(tools = ?registry.names(), "Registered built-in tools");
    Ok(())
}
