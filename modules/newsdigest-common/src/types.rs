use serde::{Deserialize, Serialize};

/// A news article as the pipeline sees it. Fetched fresh every run, never persisted.
///
/// `url` is the identity key: two articles with the same url are the same article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content_preview: String,
    pub source_name: String,
    pub published_at: String,
    /// The search query that surfaced this article.
    pub search_query: String,
}
