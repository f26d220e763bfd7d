//! Wikipedia Lookup Tool
//!
//! Resolves the requested name to the best-matching article through a
//! MediaWiki search, then fetches that article's plain-text extract.

use async_trait::async_trait;
use serde::Deserialize;

use chat_core::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};

use crate::builtin::BuiltinTool;
use crate::config::ToolsConfig;
use crate::error::{Result, ToolError};
use crate::model::SearchResult;

/// Arguments of `lookup_wikipedia`
#[derive(Debug, Deserialize)]
pub struct LookupArgs {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: PageQuery,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    missing: bool,
}

fn best_title(response: SearchResponse, name: &str) -> Result<String> {
    response
        .query
        .search
        .into_iter()
        .next()
        .map(|hit| hit.title)
        .ok_or_else(|| ToolError::NotFound(name.to_string()))
}

fn page_to_result(response: PageResponse, title: &str) -> Result<SearchResult> {
    let page = response
        .query
        .pages
        .into_iter()
        .find(|p| !p.missing)
        .ok_or_else(|| ToolError::NotFound(title.to_string()))?;
    Ok(SearchResult::new(page.title, page.fullurl, page.extract))
}

/// Tool for looking up encyclopedia articles
pub struct WikipediaLookupTool {
    http: reqwest::Client,
    endpoint: String,
}

impl WikipediaLookupTool {
    pub fn new(http: reqwest::Client, config: &ToolsConfig) -> Self {
        Self {
            http,
            endpoint: config.wikipedia_url.clone(),
        }
    }

    async fn lookup(&self, name: &str) -> Result<SearchResult> {
        let search: SearchResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", name),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let title = best_title(search, name)?;

        let page: PageResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|info"),
                ("inprop", "url"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        page_to_result(page, &title)
    }
}

#[async_trait]
impl Tool for WikipediaLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: BuiltinTool::LookupWikipedia.name().into(),
            description: "Look up an article on Wikipedia.".into(),
            parameters: vec![ParameterSchema::required(
                "name",
                "string",
                "The name of the article to look up.",
            )],
        }
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: LookupArgs = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => {
                return ToolResult::error(
                    "Attempted to look up an article on Wikipedia, but the arguments were invalid",
                    ToolError::InvalidArguments(e.to_string()),
                );
            }
        };

        match self.lookup(&args.name).await {
            Ok(article) => {
                let url = article.url.clone().unwrap_or_default();
                ToolResult::new(
                    format!("[Looked up '{}' on Wikipedia]({})", args.name, url),
                    serde_json::to_value(article).unwrap_or_default(),
                )
            }
            Err(e) => {
                tracing::warn!(name = %args.name, error = %e, "Wikipedia lookup failed");
                ToolResult::error(
                    format!(
                        "Attempted to look up '{}' on Wikipedia, but an error occurred",
                        args.name
                    ),
                    e,
                )
            }
        }
    }
}
