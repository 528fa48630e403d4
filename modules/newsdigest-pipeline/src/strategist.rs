//! Topic → search queries, cache first.
//!
//! A cache hit is returned verbatim. On a miss the language model proposes
//! queries; if that fails for any reason a single query derived from the topic
//! text is used instead. What gets written back depends on the
//! [`FallbackCachePolicy`].

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use newsdigest_common::FallbackCacheSetting;

use crate::list_parser::parse_queries;
use crate::query_cache::{compute_key, CacheEntry, QueryCache};
use crate::traits::{CompletionRequest, LanguageModel};

pub const STRATEGY_MAX_TOKENS: u32 = 200;
pub const STRATEGY_TEMPERATURE: f32 = 0.3;

const STRATEGY_SYSTEM: &str = "\
You are a search strategy expert. Convert user requests into effective news search queries.\n\n\
Rules:\n\
- Return ONLY a list of quoted strings, no other text\n\
- Each query should be 2-4 words max for NewsAPI\n\
- Focus on different angles of the topic\n\
- Include industry-specific terms when relevant\n\
- Avoid overly broad or specific terms";

fn strategy_prompt(topic: &str, max_queries: usize) -> String {
    let example: Vec<String> = (1..=max_queries).map(|i| format!("\"query{i}\"")).collect();
    format!(
        "Convert this request into {max_queries} effective NewsAPI search queries:\n\
         \"{topic}\"\n\n\
         Return format: [{}]",
        example.join(", ")
    )
}

/// How cached fallback entries are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackCachePolicy {
    /// Fallbacks are cached and served like any other entry.
    #[default]
    Always,
    /// Fallbacks are never written; a cached one is treated as a miss.
    Never,
    /// A cached fallback is served until it is this old, then retried.
    RetryAfter(Duration),
}

impl FallbackCachePolicy {
    /// Whether a cached entry may be returned as a hit at `now`.
    pub fn serves(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        if !entry.is_fallback {
            return true;
        }
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::RetryAfter(window) => now - entry.created_at < *window,
        }
    }

    fn caches_fallbacks(&self) -> bool {
        !matches!(self, Self::Never)
    }
}

impl From<FallbackCacheSetting> for FallbackCachePolicy {
    fn from(setting: FallbackCacheSetting) -> Self {
        match setting {
            FallbackCacheSetting::Always => Self::Always,
            FallbackCacheSetting::Never => Self::Never,
            FallbackCacheSetting::RetryAfterHours(hours) => Self::RetryAfter(
                i64::try_from(hours)
                    .ok()
                    .and_then(Duration::try_hours)
                    .unwrap_or(Duration::MAX),
            ),
        }
    }
}

/// Degraded single query: the topic with the literal `" news"` and
/// `" headlines"` removed.
pub fn fallback_query(topic: &str) -> String {
    let stripped = topic.replace(" news", "").replace(" headlines", "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        topic.trim().to_string()
    } else {
        stripped.to_string()
    }
}

pub struct QueryStrategist {
    llm: Arc<dyn LanguageModel>,
    cache: QueryCache,
    fallback_policy: FallbackCachePolicy,
}

impl QueryStrategist {
    pub fn new(llm: Arc<dyn LanguageModel>, cache: QueryCache) -> Self {
        Self {
            llm,
            cache,
            fallback_policy: FallbackCachePolicy::default(),
        }
    }

    pub fn with_fallback_policy(mut self, policy: FallbackCachePolicy) -> Self {
        self.fallback_policy = policy;
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Ordered search queries for `topic`. Never empty.
    pub async fn generate(&mut self, topic: &str, max_queries: usize) -> Vec<String> {
        let max_queries = max_queries.max(1);
        let key = compute_key(topic, max_queries);

        let mut replaces_fallback = false;
        if let Some(entry) = self.cache.lookup(&key) {
            if self.fallback_policy.serves(entry, Utc::now()) {
                if entry.queries.is_empty() {
                    warn!(topic, key = %key, "Cached entry has no queries, using fallback query");
                    return vec![fallback_query(topic)];
                }
                info!(
                    topic,
                    queries = entry.queries.len(),
                    fallback = entry.is_fallback,
                    "Query cache hit"
                );
                return entry.queries.clone();
            }
            debug!(topic, key = %key, "Cached fallback expired, retrying generation");
            replaces_fallback = true;
        }

        match self.ask_model(topic, max_queries).await {
            Ok((queries, raw)) => {
                info!(topic, queries = ?queries, "Generated search queries");
                let entry = CacheEntry::generated(topic, max_queries, queries.clone(), Some(raw));
                if replaces_fallback {
                    self.cache.supersede_fallback(entry);
                } else {
                    self.cache.insert(entry);
                }
                queries
            }
            Err(e) => {
                let queries = vec![fallback_query(topic)];
                warn!(
                    topic,
                    error = %e,
                    fallback = ?queries,
                    "Query generation failed, using fallback query"
                );
                if self.fallback_policy.caches_fallbacks() {
                    let entry =
                        CacheEntry::fallback(topic, max_queries, queries.clone(), e.to_string());
                    if replaces_fallback {
                        self.cache.supersede_fallback(entry);
                    } else {
                        self.cache.insert(entry);
                    }
                }
                queries
            }
        }
    }

    async fn ask_model(&self, topic: &str, max_queries: usize) -> Result<(Vec<String>, String)> {
        let raw = self
            .llm
            .complete(CompletionRequest {
                system: STRATEGY_SYSTEM.to_string(),
                prompt: strategy_prompt(topic, max_queries),
                max_tokens: STRATEGY_MAX_TOKENS,
                temperature: STRATEGY_TEMPERATURE,
            })
            .await?;

        let (queries, mode) = parse_queries(&raw, max_queries)
            .ok_or_else(|| anyhow!("model response contained no usable queries"))?;
        debug!(topic, mode = ?mode, "Parsed model query list");
        Ok((queries, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_cache::{CacheMap, MemoryStore};
    use crate::testing::MockLanguageModel;

    fn strategist(llm: MockLanguageModel, store: MemoryStore) -> QueryStrategist {
        QueryStrategist::new(Arc::new(llm), QueryCache::load(Box::new(store)))
    }

    #[test]
    fn fallback_strips_news_and_headlines() {
        assert_eq!(fallback_query("xyz news"), "xyz");
        assert_eq!(fallback_query("tech headlines today"), "tech today");
        assert_eq!(
            fallback_query("gaming, xbox, and electronics"),
            "gaming, xbox, and electronics"
        );
        assert_eq!(fallback_query(" news"), "news");
    }

    #[test]
    fn prompt_lists_requested_count() {
        let prompt = strategy_prompt("ufc", 3);
        assert!(prompt.contains("into 3 effective"));
        assert!(prompt.contains(r#"["query1", "query2", "query3"]"#));
    }

    #[tokio::test]
    async fn miss_calls_model_and_caches() {
        let llm = MockLanguageModel::new().with_response(r#"["nfl trades", "bears roster"]"#);
        let store = MemoryStore::new();
        let mut s = strategist(llm.clone(), store.clone());

        let queries = s.generate("Chicago Bears and the NFL", 5).await;
        assert_eq!(queries, vec!["nfl trades", "bears roster"]);

        let request = &llm.requests()[0];
        assert_eq!(request.max_tokens, STRATEGY_MAX_TOKENS);
        assert_eq!(request.temperature, STRATEGY_TEMPERATURE);
        assert!(request.prompt.contains("Chicago Bears and the NFL"));

        let saved = store.snapshot();
        let entry = saved.get(&compute_key("chicago bears and the nfl", 5)).unwrap();
        assert!(!entry.is_fallback);
        assert_eq!(entry.raw_model_output.as_deref(), Some(r#"["nfl trades", "bears roster"]"#));
    }

    #[tokio::test]
    async fn hit_skips_model() {
        let llm = MockLanguageModel::new().with_response(r#"["first"]"#);
        let mut s = strategist(llm.clone(), MemoryStore::new());

        s.generate("topic", 5).await;
        let again = s.generate("  TOPIC ", 5).await;
        assert_eq!(again, vec!["first"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn hand_edited_entry_is_trusted() {
        let mut entry = CacheEntry::generated("marketing", 5, vec!["old".into()], None);
        entry.queries = vec!["ad spend".into(), "brand deals".into()];
        let mut map = CacheMap::new();
        map.insert(entry.cache_key.clone(), entry);

        let llm = MockLanguageModel::new();
        let mut s = strategist(llm.clone(), MemoryStore::with_entries(map));
        assert_eq!(s.generate("marketing", 5).await, vec!["ad spend", "brand deals"]);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn emptied_entry_yields_fallback_and_is_left_alone() {
        let mut entry = CacheEntry::generated("xyz news", 5, vec!["xyz launch".into()], None);
        entry.queries.clear();
        let mut map = CacheMap::new();
        map.insert(entry.cache_key.clone(), entry.clone());

        let llm = MockLanguageModel::new();
        let store = MemoryStore::with_entries(map);
        let mut s = strategist(llm.clone(), store.clone());

        assert_eq!(s.generate("xyz news", 5).await, vec!["xyz"]);
        assert_eq!(llm.calls(), 0);
        assert_eq!(store.persist_count(), 0);
        assert_eq!(s.cache().lookup(&entry.cache_key), Some(&entry));
    }

    #[tokio::test]
    async fn failure_uses_and_caches_fallback() {
        let llm = MockLanguageModel::new().with_failure("connection reset");
        let store = MemoryStore::new();
        let mut s = strategist(llm.clone(), store.clone());

        assert_eq!(s.generate("xyz news", 5).await, vec!["xyz"]);

        let entry = store.snapshot().remove(&compute_key("xyz news", 5)).unwrap();
        assert!(entry.is_fallback);
        assert!(entry.failure_reason.unwrap().contains("connection reset"));

        // Cached failure is served without retrying.
        assert_eq!(s.generate("xyz news", 5).await, vec!["xyz"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn unparseable_response_falls_back() {
        let llm = MockLanguageModel::new().with_response("   \n\n");
        let mut s = strategist(llm, MemoryStore::new());
        assert_eq!(s.generate("solar headlines", 3).await, vec!["solar"]);
        let entry = s.cache().lookup(&compute_key("solar headlines", 3)).unwrap();
        assert!(entry.is_fallback);
    }

    #[tokio::test]
    async fn never_policy_does_not_cache_fallbacks() {
        let llm = MockLanguageModel::new()
            .with_failure("boom")
            .with_response(r#"["retry works"]"#);
        let store = MemoryStore::new();
        let mut s = strategist(llm.clone(), store.clone())
            .with_fallback_policy(FallbackCachePolicy::Never);

        assert_eq!(s.generate("xyz news", 5).await, vec!["xyz"]);
        assert!(store.snapshot().is_empty());

        assert_eq!(s.generate("xyz news", 5).await, vec!["retry works"]);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn expired_fallback_is_superseded() {
        let mut old = CacheEntry::fallback("xyz news", 5, vec!["xyz".into()], "timeout");
        old.created_at = Utc::now() - Duration::hours(48);
        let mut map = CacheMap::new();
        map.insert(old.cache_key.clone(), old);

        let llm = MockLanguageModel::new().with_response(r#"["xyz launch", "xyz earnings"]"#);
        let store = MemoryStore::with_entries(map);
        let mut s = strategist(llm.clone(), store.clone())
            .with_fallback_policy(FallbackCachePolicy::RetryAfter(Duration::hours(24)));

        assert_eq!(s.generate("xyz news", 5).await, vec!["xyz launch", "xyz earnings"]);
        let entry = store.snapshot().remove(&compute_key("xyz news", 5)).unwrap();
        assert!(!entry.is_fallback);
    }

    #[tokio::test]
    async fn fresh_fallback_is_served_under_retry_window() {
        let fresh = CacheEntry::fallback("xyz news", 5, vec!["xyz".into()], "timeout");
        let mut map = CacheMap::new();
        map.insert(fresh.cache_key.clone(), fresh);

        let llm = MockLanguageModel::new();
        let mut s = strategist(llm.clone(), MemoryStore::with_entries(map))
            .with_fallback_policy(FallbackCachePolicy::RetryAfter(Duration::hours(24)));
        assert_eq!(s.generate("xyz news", 5).await, vec!["xyz"]);
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn setting_converts_to_policy() {
        assert_eq!(
            FallbackCachePolicy::from(FallbackCacheSetting::RetryAfterHours(6)),
            FallbackCachePolicy::RetryAfter(Duration::hours(6))
        );
        assert_eq!(
            FallbackCachePolicy::from(FallbackCacheSetting::Never),
            FallbackCachePolicy::Never
        );
    }
}
