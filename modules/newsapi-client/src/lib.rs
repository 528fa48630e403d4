pub mod error;
pub mod types;

pub use error::{NewsApiError, Result};
pub use types::{ArticleSource, EverythingRequest, EverythingResponse, NewsArticle, SortBy};

use reqwest::StatusCode;

const BASE_URL: &str = "https://newsapi.org/v2";

pub struct NewsApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Search all indexed articles. One request, no retries.
    pub async fn everything(&self, request: &EverythingRequest) -> Result<EverythingResponse> {
        let url = format!("{}/everything", self.base_url);
        tracing::debug!(query = %request.query, from = %request.from, "NewsAPI everything request");

        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(NewsApiError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(NewsApiError::RateLimited),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                return Err(NewsApiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }
        }

        let body = resp.text().await?;
        let parsed: EverythingResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
