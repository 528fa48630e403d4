//! Persistent topic → search-query cache.
//!
//! Entries are keyed by a SHA-256 of the normalized topic and the requested
//! query count. Once written an entry is never overwritten by a plain insert;
//! operators correct bad query sets by editing the JSON file between runs.

mod store;

pub use store::{CacheError, CacheMap, CacheStore, JsonFileStore, MemoryStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Joins topic and count before hashing. Never appears in typed topics.
const KEY_SEPARATOR: &str = "\u{1f}";

/// Lowercase + trim. Two topics that normalize equal share a cache entry.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Deterministic cache key: hex SHA-256 of `normalize(topic) ␟ count`.
pub fn compute_key(topic: &str, count: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_topic(topic).as_bytes());
    hasher.update(KEY_SEPARATOR.as_bytes());
    hasher.update(count.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub original_topic: String,
    pub normalized_topic: String,
    pub requested_count: usize,
    /// Relevance order as assigned by the strategist.
    pub queries: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub raw_model_output: Option<String>,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl CacheEntry {
    /// Entry for queries the model produced.
    pub fn generated(
        topic: &str,
        requested_count: usize,
        queries: Vec<String>,
        raw_model_output: Option<String>,
    ) -> Self {
        Self {
            cache_key: compute_key(topic, requested_count),
            original_topic: topic.to_string(),
            normalized_topic: normalize_topic(topic),
            requested_count,
            queries,
            created_at: Utc::now(),
            raw_model_output,
            is_fallback: false,
            failure_reason: None,
        }
    }

    /// Entry for the locally derived query used when generation failed.
    pub fn fallback(
        topic: &str,
        requested_count: usize,
        queries: Vec<String>,
        failure_reason: impl Into<String>,
    ) -> Self {
        Self {
            cache_key: compute_key(topic, requested_count),
            original_topic: topic.to_string(),
            normalized_topic: normalize_topic(topic),
            requested_count,
            queries,
            created_at: Utc::now(),
            raw_model_output: None,
            is_fallback: true,
            failure_reason: Some(failure_reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New entry stored and persisted.
    Inserted,
    /// An entry already existed under this key; it was kept as is.
    AlreadyPresent,
}

pub struct QueryCache {
    store: Box<dyn CacheStore>,
    entries: CacheMap,
}

impl QueryCache {
    /// Load the store once. Missing or unreadable data yields an empty cache with a warning.
    pub fn load(store: Box<dyn CacheStore>) -> Self {
        let entries = match store.load() {
            Ok(entries) => {
                info!(
                    location = %store.location(),
                    entries = entries.len(),
                    "Loaded query cache"
                );
                entries
            }
            Err(e) => {
                warn!(
                    location = %store.location(),
                    error = %e,
                    "Query cache unreadable, starting empty"
                );
                CacheMap::new()
            }
        };
        Self { store, entries }
    }

    pub fn lookup(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Store `entry` under the key computed from its own topic and count.
    ///
    /// An existing entry wins: the insert is a no-op that still succeeds.
    /// A new entry is persisted immediately; a failed persist is logged and the
    /// in-memory cache stays authoritative for the rest of the run.
    pub fn insert(&mut self, mut entry: CacheEntry) -> InsertOutcome {
        let key = compute_key(&entry.normalized_topic, entry.requested_count);
        if self.entries.contains_key(&key) {
            debug!(key = %key, "Cache entry already present, keeping original");
            return InsertOutcome::AlreadyPresent;
        }
        entry.cache_key = key.clone();
        self.entries.insert(key, entry);
        self.persist_logged();
        InsertOutcome::Inserted
    }

    /// Replace a fallback entry with a newer one (generated or fallback).
    ///
    /// This is the only way an entry is ever overwritten, and it never touches
    /// entries the model produced. Returns whether the store changed.
    pub fn supersede_fallback(&mut self, mut entry: CacheEntry) -> bool {
        let key = compute_key(&entry.normalized_topic, entry.requested_count);
        match self.entries.get(&key) {
            Some(existing) if !existing.is_fallback => {
                debug!(key = %key, "Refusing to supersede a generated entry");
                false
            }
            _ => {
                entry.cache_key = key.clone();
                self.entries.insert(key, entry);
                self.persist_logged();
                true
            }
        }
    }

    /// Write the full cache to the backing store.
    pub fn persist(&self) -> Result<(), CacheError> {
        self.store.persist(&self.entries)
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            warn!(
                location = %self.store.location(),
                error = %e,
                "Failed to persist query cache, keeping in-memory copy"
            );
        }
    }

    /// All entries, newest first.
    pub fn entries(&self) -> Vec<&CacheEntry> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.cache_key.cmp(&b.cache_key))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn compute_key_matches_known_digest() {
        // sha256("xyz news\x1f5")
        assert_eq!(
            compute_key("xyz news", 5),
            "36f3fa167aeb07a07c47455cff56dd64124df8ef59f332cafc76c5e06af1436b"
        );
    }

    #[test]
    fn compute_key_normalizes_topic() {
        assert_eq!(
            compute_key("  Chicago Bears and the NFL ", 5),
            compute_key("chicago bears and the nfl", 5)
        );
        assert_eq!(
            compute_key("chicago bears and the nfl", 5),
            "b7a9cd9c41140983399626ab141ccde957a787451eccf493427054a3591cf75f"
        );
    }

    #[test]
    fn compute_key_distinguishes_topic_and_count() {
        assert_ne!(compute_key("xbox", 5), compute_key("xbox", 4));
        assert_ne!(compute_key("xbox", 5), compute_key("playstation", 5));
        assert_eq!(compute_key("xbox", 5).len(), 64);
    }

    #[test]
    fn round_trip_through_store() {
        let store = MemoryStore::new();
        let entry = CacheEntry::generated(
            "Gaming, Xbox, and Electronics",
            5,
            vec!["xbox series".into(), "gaming hardware".into()],
            Some("[\"xbox series\", \"gaming hardware\"]".into()),
        );
        let key = entry.cache_key.clone();

        let mut cache = QueryCache::load(Box::new(store.clone()));
        assert_eq!(cache.insert(entry.clone()), InsertOutcome::Inserted);

        let reloaded = QueryCache::load(Box::new(store));
        assert_eq!(reloaded.lookup(&key), Some(&entry));
    }

    #[test]
    fn insert_is_idempotent_and_first_wins() {
        let store = MemoryStore::new();
        let mut cache = QueryCache::load(Box::new(store.clone()));

        let first = CacheEntry::generated("xbox", 5, vec!["first".into()], None);
        let second = CacheEntry::generated("  XBOX ", 5, vec!["second".into()], None);

        assert_eq!(cache.insert(first.clone()), InsertOutcome::Inserted);
        assert_eq!(cache.insert(second), InsertOutcome::AlreadyPresent);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&first.cache_key).unwrap().queries, vec!["first"]);
        assert_eq!(store.persist_count(), 1);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn persist_failure_keeps_memory_copy() {
        let store = MemoryStore::new().failing_persist();
        let mut cache = QueryCache::load(Box::new(store.clone()));

        let entry = CacheEntry::generated("xbox", 5, vec!["xbox".into()], None);
        assert_eq!(cache.insert(entry.clone()), InsertOutcome::Inserted);

        assert_eq!(cache.lookup(&entry.cache_key), Some(&entry));
        assert!(store.snapshot().is_empty());
        assert!(cache.persist().is_err());
    }

    #[test]
    fn unreadable_store_loads_empty() {
        let cache = QueryCache::load(Box::new(MemoryStore::new().failing_load()));
        assert!(cache.is_empty());
    }

    #[test]
    fn supersede_only_replaces_fallbacks() {
        let mut cache = QueryCache::load(Box::new(MemoryStore::new()));

        let fallback = CacheEntry::fallback("xyz news", 5, vec!["xyz".into()], "timeout");
        cache.insert(fallback.clone());

        let generated = CacheEntry::generated("xyz news", 5, vec!["xyz launch".into()], None);
        assert!(cache.supersede_fallback(generated.clone()));
        assert_eq!(cache.lookup(&fallback.cache_key), Some(&generated));

        let another = CacheEntry::generated("xyz news", 5, vec!["other".into()], None);
        assert!(!cache.supersede_fallback(another));
        assert_eq!(cache.lookup(&fallback.cache_key), Some(&generated));
    }

    #[test]
    fn entries_are_sorted_newest_first() {
        let mut cache = QueryCache::load(Box::new(MemoryStore::new()));
        let now = Utc::now();
        for (topic, age_hours) in [("old", 48), ("new", 1), ("mid", 12)] {
            let mut entry = CacheEntry::generated(topic, 5, vec![topic.into()], None);
            entry.created_at = now - Duration::hours(age_hours);
            cache.insert(entry);
        }
        let topics: Vec<&str> = cache
            .entries()
            .iter()
            .map(|e| e.original_topic.as_str())
            .collect();
        assert_eq!(topics, vec!["new", "mid", "old"]);
    }

    #[test]
    fn hand_edited_file_is_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query_cache.json");
        let store = JsonFileStore::new(&path);

        let mut cache = QueryCache::load(Box::new(JsonFileStore::new(&path)));
        let entry = CacheEntry::generated("xbox", 5, vec!["bad translation".into()], None);
        let key = entry.cache_key.clone();
        cache.insert(entry);

        let edited = std::fs::read_to_string(&path)
            .unwrap()
            .replace("bad translation", "xbox console");
        std::fs::write(&path, edited).unwrap();

        let reloaded = QueryCache::load(Box::new(store));
        assert_eq!(reloaded.lookup(&key).unwrap().queries, vec!["xbox console"]);
    }
}
