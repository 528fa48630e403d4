//! Multi-query article search with URL dedup.
//!
//! Each query is one NewsAPI request. A failing query is logged and skipped;
//! the rest of the batch still runs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, warn};

use ai_client::truncate_to_char_boundary;
use newsapi_client::{EverythingRequest, NewsApiError, NewsArticle};
use newsdigest_common::Article;

use crate::traits::NewsSearch;

pub const PAGE_SIZE: u32 = 20;
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(100);

const SAMPLE_HEADLINES: usize = 3;
const SAMPLE_HEADLINE_BYTES: usize = 80;

pub struct ArticleSearch {
    news: Arc<dyn NewsSearch>,
    delay: Duration,
}

impl ArticleSearch {
    pub fn new(news: Arc<dyn NewsSearch>) -> Self {
        Self {
            news,
            delay: DEFAULT_SEARCH_DELAY,
        }
    }

    /// Pause inserted between successive requests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run every query, tag results with their query, and dedup by url.
    /// An empty result means "no news", not an error.
    pub async fn search(
        &self,
        queries: &[String],
        days_back: u32,
        sources: Option<&str>,
        language: &str,
    ) -> Vec<Article> {
        let from = from_date(days_back);
        info!(from = %from, queries = queries.len(), "Searching news");

        let mut collected = Vec::new();
        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let request = EverythingRequest::new(query.clone(), from)
                .language(language)
                .page_size(PAGE_SIZE)
                .sources(sources.map(str::to_string));

            match self.news.everything(&request).await {
                Ok(response) => {
                    info!(
                        query = %query,
                        articles = response.articles.len(),
                        total_results = response.total_results,
                        "Search returned"
                    );
                    collected.extend(
                        response
                            .articles
                            .into_iter()
                            .filter_map(|a| to_article(a, query)),
                    );
                }
                Err(e) => {
                    let status = e.downcast_ref::<NewsApiError>().and_then(NewsApiError::status);
                    warn!(
                        query = %query,
                        status = ?status,
                        error = %e,
                        hint = failure_hint(status),
                        "Search failed, skipping query"
                    );
                }
            }
        }

        let unique = dedup_by_url(collected);
        info!(articles = unique.len(), "Unique articles after dedup");
        for (i, article) in unique.iter().take(SAMPLE_HEADLINES).enumerate() {
            info!(
                "  {}. {}...",
                i + 1,
                truncate_to_char_boundary(&article.title, SAMPLE_HEADLINE_BYTES)
            );
        }
        unique
    }
}

/// Earliest publish date included in a search window. Saturates at the
/// earliest representable date instead of overflowing.
pub fn from_date(days_back: u32) -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days_back)))
        .unwrap_or(NaiveDate::MIN)
}

/// Keep the first article for each url, preserving order.
pub fn dedup_by_url(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.url.clone()))
        .collect()
}

fn failure_hint(status: Option<u16>) -> &'static str {
    match status {
        Some(401) => "check your NewsAPI key",
        Some(429) => "rate limit exceeded, try again later",
        _ => "",
    }
}

/// Wire article → pipeline article. Articles without a url are dropped.
fn to_article(article: NewsArticle, query: &str) -> Option<Article> {
    let url = article.url.filter(|u| !u.trim().is_empty())?;
    Some(Article {
        url,
        title: article.title.unwrap_or_else(|| "No title".to_string()),
        description: article
            .description
            .unwrap_or_else(|| "No description".to_string()),
        content_preview: article.content.unwrap_or_default(),
        source_name: article
            .source
            .and_then(|s| s.name)
            .unwrap_or_else(|| "Unknown".to_string()),
        published_at: article.published_at.unwrap_or_else(|| "Unknown".to_string()),
        search_query: query.to_string(),
    })
}
