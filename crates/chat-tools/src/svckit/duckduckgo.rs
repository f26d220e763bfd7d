//! DuckDuckGo Search Tool
//!
//! Queries the DuckDuckGo Instant Answer API and flattens the abstract,
//! direct results and related topics into search records.

use async_trait::async_trait;
use serde::Deserialize;

use chat_core::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};

use crate::builtin::BuiltinTool;
use crate::config::ToolsConfig;
use crate::error::{Result, ToolError};
use crate::model::SearchResult;

const DEFAULT_RESULT_COUNT: usize = 5;

/// Arguments of `search_duckduckgo`
#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub query: String,

    #[serde(default, deserialize_with = "lenient_count")]
    pub result_count: Option<usize>,
}

/// Models sometimes send integers as strings
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    results: Vec<Topic>,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Topic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: Option<String>,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<Topic>,
    },
}

fn flatten_topics(topics: Vec<Topic>, out: &mut Vec<SearchResult>) {
    for topic in topics {
        match topic {
            Topic::Entry { text, first_url } => {
                let title = text
                    .split_once(" - ")
                    .map_or(text.as_str(), |(title, _)| title)
                    .to_string();
                out.push(SearchResult::new(title, first_url, Some(text)));
            }
            Topic::Group { topics } => flatten_topics(topics, out),
        }
    }
}

/// Convert an Instant Answer payload into at most `limit` results
fn collect_results(answer: InstantAnswer, limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if !answer.abstract_text.is_empty() {
        let title = if answer.heading.is_empty() {
            "No Title".to_string()
        } else {
            answer.heading
        };
        let url = (!answer.abstract_url.is_empty()).then_some(answer.abstract_url);
        results.push(SearchResult::new(title, url, Some(answer.abstract_text)));
    }
    flatten_topics(answer.results, &mut results);
    flatten_topics(answer.related_topics, &mut results);

    results.truncate(limit);
    results
}

/// Tool for searching the web through DuckDuckGo
pub struct DuckDuckGoSearchTool {
    http: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearchTool {
    pub fn new(http: reqwest::Client, config: &ToolsConfig) -> Self {
        Self {
            http,
            endpoint: config.duckduckgo_url.clone(),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let answer: InstantAnswer = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(collect_results(answer, limit))
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: BuiltinTool::SearchDuckDuckGo.name().into(),
            description: "Search for information on the internet using the search engine DuckDuckGo".into(),
            parameters: vec![
                ParameterSchema::required("query", "string", "The search query"),
                ParameterSchema::optional("result_count", "integer", "The number of results to return"),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: SearchArgs = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => {
                return ToolResult::error(
                    "Attempted to search DuckDuckGo, but the arguments were invalid",
                    ToolError::InvalidArguments(e.to_string()),
                );
            }
        };
        let limit = args.result_count.unwrap_or(DEFAULT_RESULT_COUNT).max(1);

        match self.search(&args.query, limit).await {
            Ok(results) => {
                tracing::debug!(query = %args.query, hits = results.len(), "DuckDuckGo search");
                ToolResult::new(
                    format!("Searched DuckDuckGo for '{}'", args.query),
                    serde_json::to_value(results).unwrap_or_default(),
                )
            }
            Err(e) => {
                tracing::warn!(query = %args.query, error = %e, "DuckDuckGo search failed");
                ToolResult::error(
                    format!(
                        "Attempted to search DuckDuckGo for '{}', but an error occurred",
                        args.query
                    ),
                    e,
                )
            }
        }
    }
}
