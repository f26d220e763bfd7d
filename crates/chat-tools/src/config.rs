//! Tool configuration

use std::time::Duration;

use crate::builtin::BuiltinTool;
use crate::error::{Result, ToolError};

pub const DEFAULT_DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";
pub const DEFAULT_WIKIPEDIA_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Endpoints and HTTP settings shared by the built-in tools
#[derive(Clone, Debug)]
pub struct ToolsConfig {
    pub duckduckgo_url: String,
    pub wikipedia_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,

    /// Built-in tools to register, in registration order
    pub enabled: Vec<BuiltinTool>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            duckduckgo_url: DEFAULT_DUCKDUCKGO_URL.into(),
            wikipedia_url: DEFAULT_WIKIPEDIA_URL.into(),
            timeout_secs: 15,
            user_agent: concat!("ollama-chat/", env!("CARGO_PKG_VERSION")).into(),
            enabled: BuiltinTool::ALL.to_vec(),
        }
    }
}

impl ToolsConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let timeout_secs = match lookup("TOOLS_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ToolError::Config(format!("TOOLS_TIMEOUT_SECS must be a number, got '{}'", raw))
            })?,
            None => defaults.timeout_secs,
        };

        let enabled = match lookup("ENABLED_TOOLS") {
            Some(raw) => parse_tool_list(&raw)?,
            None => defaults.enabled,
        };

        Ok(Self {
            duckduckgo_url: lookup("DUCKDUCKGO_URL").unwrap_or(defaults.duckduckgo_url),
            wikipedia_url: lookup("WIKIPEDIA_URL").unwrap_or(defaults.wikipedia_url),
            timeout_secs,
            user_agent: lookup("TOOLS_USER_AGENT").unwrap_or(defaults.user_agent),
            enabled,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// HTTP client shared by every built-in tool
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(self.user_agent.clone())
            .build()
    }
}

/// Parse a comma separated list of tool names, skipping duplicates
fn parse_tool_list(raw: &str) -> Result<Vec<BuiltinTool>> {
    let mut tools = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let tool = BuiltinTool::from_name(name)
            .ok_or_else(|| ToolError::Config(format!("unknown built-in tool '{}'", name)))?;
        if !tools.contains(&tool) {
            tools.push(tool);
        }
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = ToolsConfig::default();
        assert_eq!(config.wikipedia_url, DEFAULT_WIKIPEDIA_URL);
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.user_agent.starts_with("ollama-chat/"));
        assert_eq!(config.enabled, BuiltinTool::ALL.to_vec());
    }

    #[test]
    fn test_enabled_tools_from_lookup() {
        let config = ToolsConfig::from_lookup(lookup(&[
            ("ENABLED_TOOLS", " lookup_wikipedia, ,lookup_wikipedia"),
            ("TOOLS_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.enabled, vec![BuiltinTool::LookupWikipedia]);
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let empty = ToolsConfig::from_lookup(lookup(&[("ENABLED_TOOLS", "")])).unwrap();
        assert!(empty.enabled.is_empty());
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let unknown = ToolsConfig::from_lookup(lookup(&[("ENABLED_TOOLS", "get_weather")]));
        assert!(matches!(unknown, Err(ToolError::Config(ref msg)) if msg.contains("get_weather")));

        let timeout = ToolsConfig::from_lookup(lookup(&[("TOOLS_TIMEOUT_SECS", "soon")]));
        assert!(matches!(timeout, Err(ToolError::Config(_))));
    }
}
