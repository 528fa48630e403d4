use chrono::NaiveDate;
use serde::Deserialize;

/// Sort order accepted by the `/everything` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    Relevancy,
    Popularity,
    #[default]
    PublishedAt,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevancy => "relevancy",
            SortBy::Popularity => "popularity",
            SortBy::PublishedAt => "publishedAt",
        }
    }
}

/// Parameters for a single `/everything` search.
#[derive(Debug, Clone, PartialEq)]
pub struct EverythingRequest {
    pub query: String,
    pub from: NaiveDate,
    pub language: String,
    pub sort_by: SortBy,
    pub page_size: u32,
    /// Comma-separated source ids, e.g. "reuters,bbc-news".
    pub sources: Option<String>,
}

impl EverythingRequest {
    pub fn new(query: impl Into<String>, from: NaiveDate) -> Self {
        Self {
            query: query.into(),
            from,
            language: "en".to_string(),
            sort_by: SortBy::PublishedAt,
            page_size: 20,
            sources: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn sources(mut self, sources: Option<String>) -> Self {
        self.sources = sources.filter(|s| !s.trim().is_empty());
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.clone()),
            ("from", self.from.format("%Y-%m-%d").to_string()),
            ("language", self.language.clone()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(sources) = &self.sources {
            pairs.push(("sources", sources.clone()));
        }
        pairs
    }
}

/// Response body of `/everything`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EverythingResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
}

/// A single article as returned by NewsAPI. Every field may be null on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
