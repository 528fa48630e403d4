use std::env;
use std::path::PathBuf;

use crate::error::DigestError;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_QUERY_CACHE_PATH: &str = "query_cache.json";

/// Secrets and environment-specific values. Run parameters live in [`crate::FileConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,
    pub anthropic_model: String,

    // News search
    pub newsapi_key: String,

    // Publishing; both must be set for live GitHub delivery
    pub github_token: Option<String>,
    pub github_repo: Option<String>,

    // Local state
    pub query_cache_path: PathBuf,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, DigestError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Keeps tests off the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DigestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DigestError::Config(format!("{key} environment variable is required")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            anthropic_model: optional("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            newsapi_key: required("NEWSAPI_KEY")?,
            github_token: optional("GITHUB_TOKEN"),
            github_repo: optional("GITHUB_REPO"),
            query_cache_path: optional("QUERY_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QUERY_CACHE_PATH)),
        })
    }

    /// GitHub token and repo, when both are configured.
    pub fn github(&self) -> Option<(&str, &str)> {
        match (&self.github_token, &self.github_repo) {
            (Some(token), Some(repo)) => Some((token.as_str(), repo.as_str())),
            _ => None,
        }
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(5).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!("  ANTHROPIC_MODEL: {}", self.anthropic_model);
        tracing::info!("  NEWSAPI_KEY: {}", preview(&self.newsapi_key));
        tracing::info!("  GITHUB_TOKEN: {}", preview_opt(&self.github_token));
        tracing::info!(
            "  GITHUB_REPO: {}",
            self.github_repo.as_deref().unwrap_or("<not set>")
        );
        tracing::info!("  QUERY_CACHE_PATH: {}", self.query_cache_path.display());
    }
}
