// crates/core/src/article.rs
//! The article a user is currently looking at.

use serde::{Deserialize, Serialize};

/// Title/summary (and optional pull quote) of an article, as sent by the
/// frontend with every carousel, audio-summary and voice-chat request.
/// Absent fields deserialize as blank so `missing_field` can name them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleContext {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

impl ArticleContext {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            quote: None,
        }
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = Some(quote.into());
        self
    }

    /// Name of the first required field that is missing or blank.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.summary.trim().is_empty() {
            Some("summary")
        } else {
            None
        }
    }

    /// Non-blank quote, if any.
    pub fn quote(&self) -> Option<&str> {
        self.quote.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}
