use thiserror::Error;

pub type Result<T> = std::result::Result<T, NewsApiError>;

#[derive(Debug, Error)]
pub enum NewsApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid NewsAPI credentials (status 401)")]
    Unauthorized,

    #[error("NewsAPI rate limit exceeded (status 429)")]
    RateLimited,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl NewsApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            NewsApiError::Unauthorized => Some(401),
            NewsApiError::RateLimited => Some(429),
            NewsApiError::Api { status, .. } => Some(*status),
            NewsApiError::Network(_) | NewsApiError::Parse(_) => None,
        }
    }
}

impl From<reqwest::Error> for NewsApiError {
    fn from(err: reqwest::Error) -> Self {
        NewsApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NewsApiError {
    fn from(err: serde_json::Error) -> Self {
        NewsApiError::Parse(err.to_string())
    }
}
