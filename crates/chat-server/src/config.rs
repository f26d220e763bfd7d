//! Server configuration

use std::path::PathBuf;

use anyhow::Context;

use chat_core::UnknownToolPolicy;

pub const DEFAULT_MODEL: &str = "deepseek-r1:8b";

/// Settings read from the environment at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub default_model: String,
    pub enable_tools: bool,
    pub max_tool_turns: usize,
    pub unknown_tool_policy: UnknownToolPolicy,
    pub system_prompt: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            db_path: PathBuf::from("data/chats.db"),
            static_dir: PathBuf::from("static"),
            default_model: DEFAULT_MODEL.into(),
            enable_tools: true,
            max_tool_turns: 8,
            unknown_tool_policy: UnknownToolPolicy::default(),
            system_prompt: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("CHAT_DB_PATH") {
            config.db_path = path.into();
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            config.static_dir = dir.into();
        }
        if let Some(model) = lookup("DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Some(flag) = lookup("ENABLE_TOOLS") {
            config.enable_tools = parse_flag(&flag)
                .with_context(|| format!("ENABLE_TOOLS must be true or false, got '{}'", flag))?;
        }
        if let Some(turns) = lookup("MAX_TOOL_TURNS") {
            config.max_tool_turns = turns
                .parse()
                .with_context(|| format!("MAX_TOOL_TURNS must be a number, got '{}'", turns))?;
        }
        if let Some(policy) = lookup("UNKNOWN_TOOL_POLICY") {
            config.unknown_tool_policy = policy.parse()?;
        }
        config.system_prompt = lookup("SYSTEM_PROMPT").filter(|p| !p.trim().is_empty());

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.default_model, "deepseek-r1:8b");
        assert!(config.enable_tools);
        assert_eq!(config.max_tool_turns, 8);
        assert_eq!(config.unknown_tool_policy, UnknownToolPolicy::ReportToModel);
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DEFAULT_MODEL", "llama3.2"),
            ("ENABLE_TOOLS", "off"),
            ("MAX_TOOL_TURNS", "3"),
            ("UNKNOWN_TOOL_POLICY", "fail"),
            ("SYSTEM_PROMPT", "Be brief."),
        ]))
        .unwrap();

        assert_eq!(config.default_model, "llama3.2");
        assert!(!config.enable_tools);
        assert_eq!(config.max_tool_turns, 3);
        assert_eq!(config.unknown_tool_policy, UnknownToolPolicy::Fail);
        assert_eq!(config.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("ENABLE_TOOLS", "maybe")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("MAX_TOOL_TURNS", "many")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("UNKNOWN_TOOL_POLICY", "ignore")])).is_err());
    }
}
