//! Result records returned to the model

use serde::{Deserialize, Serialize};

/// One search hit or article
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: Option<String>,
    pub content: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: Option<String>, content: Option<String>) -> Self {
        Self {
            title: title.into(),
            url,
            content,
        }
    }
}
