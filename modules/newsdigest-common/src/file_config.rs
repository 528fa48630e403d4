use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Topics covered when no config file or `--topic` flag says otherwise.
pub const DEFAULT_TOPICS: &[&str] = &[
    "consumer behavior, marketing, and advertising",
    "gaming, xbox, and electronics",
    "chicago bears and the NFL",
    "Yale and Penn State College Football",
    "Mixed Martial Arts, the UFC, and Brazilian Jiu Jitsu",
];

/// TOML-backed run parameters. Secrets stay in env vars (see [`crate::Config`]).
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub topics: Vec<String>,
    pub days_back: u32,
    pub max_headlines: usize,
    pub max_queries: usize,
    pub language: String,
    /// Comma-separated NewsAPI source ids, e.g. "reuters,bbc-news".
    pub sources: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub mention_users: Vec<String>,
    /// Post each digest as a comment on this issue instead of opening a new one.
    pub comment_on_issue: Option<u64>,
    pub search_delay_ms: u64,
    pub fallback_cache: FallbackCacheSetting,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            days_back: 1,
            max_headlines: 5,
            max_queries: 5,
            language: "en".to_string(),
            sources: None,
            labels: vec!["news-summary".to_string(), "automated".to_string()],
            assignees: Vec::new(),
            mention_users: Vec::new(),
            comment_on_issue: None,
            search_delay_ms: 100,
            fallback_cache: FallbackCacheSetting::Always,
        }
    }
}

/// Whether degraded (fallback) query sets are written to the query cache.
///
/// ```toml
/// fallback_cache = "always"                  # cache failures forever
/// fallback_cache = "never"                   # retry the model every run
/// fallback_cache = { retry_after_hours = 24 } # retry once the entry is a day old
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCacheSetting {
    #[default]
    Always,
    Never,
    RetryAfterHours(u64),
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse run config")
    }
}

/// Load and parse a TOML run config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    FileConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.topics.len(), 5);
        assert_eq!(config.labels, vec!["news-summary", "automated"]);
    }

    #[test]
    fn parses_overrides_and_policy_forms() {
        let config = FileConfig::from_toml_str(
            r#"
            topics = ["rust language"]
            days_back = 3
            sources = "reuters,bbc-news"
            comment_on_issue = 12
            fallback_cache = { retry_after_hours = 24 }
            "#,
        )
        .unwrap();
        assert_eq!(config.topics, vec!["rust language"]);
        assert_eq!(config.days_back, 3);
        assert_eq!(config.sources.as_deref(), Some("reuters,bbc-news"));
        assert_eq!(config.comment_on_issue, Some(12));
        assert_eq!(config.fallback_cache, FallbackCacheSetting::RetryAfterHours(24));
        assert_eq!(config.max_headlines, 5);

        let never = FileConfig::from_toml_str(r#"fallback_cache = "never""#).unwrap();
        assert_eq!(never.fallback_cache, FallbackCacheSetting::Never);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(FileConfig::from_toml_str("dayz_back = 2").is_err());
    }

    #[test]
    fn load_config_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_headlines = 8").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.max_headlines, 8);
    }
}
