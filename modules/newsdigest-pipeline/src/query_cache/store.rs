//! Backing stores for the query cache.
//!
//! The cache never patches a file in place: every persist rewrites the whole
//! map to a temp file in the same directory and renames it over the target, so
//! a concurrent reader sees either the old file or the new one.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::CacheEntry;

/// Cache key → entry. `BTreeMap` keeps keys sorted on disk.
pub type CacheMap = BTreeMap<String, CacheEntry>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cache file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait CacheStore: Send + Sync {
    /// Read the whole store. A store that does not exist yet is empty, not an error.
    fn load(&self) -> Result<CacheMap, CacheError>;

    /// Replace the whole store with `entries`.
    fn persist(&self, entries: &CacheMap) -> Result<(), CacheError>;

    /// Human-readable location for log lines.
    fn location(&self) -> String;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Pretty-printed JSON object on disk, hand-editable between runs.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<CacheMap, CacheError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CacheMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(CacheMap::new());
        }
        serde_json::from_str(&content).map_err(|source| CacheError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, entries: &CacheMap) -> Result<(), CacheError> {
        let mut json = serde_json::to_string_pretty(entries)?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store. Clones share the same map, so a test can keep a handle
/// and inspect what the cache persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    entries: CacheMap,
    persist_count: usize,
    fail_persist: bool,
    fail_load: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: CacheMap) -> Self {
        let store = Self::default();
        store.lock().entries = entries;
        store
    }

    /// Every persist call fails; loads still succeed.
    pub fn failing_persist(self) -> Self {
        self.lock().fail_persist = true;
        self
    }

    /// Every load call fails, as if the backing data were corrupt.
    pub fn failing_load(self) -> Self {
        self.lock().fail_load = true;
        self
    }

    /// What was last persisted.
    pub fn snapshot(&self) -> CacheMap {
        self.lock().entries.clone()
    }

    pub fn persist_count(&self) -> usize {
        self.lock().persist_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding this lock can only come from a test assertion.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<CacheMap, CacheError> {
        let state = self.lock();
        if state.fail_load {
            return Err(CacheError::Unavailable("memory store load disabled".into()));
        }
        Ok(state.entries.clone())
    }

    fn persist(&self, entries: &CacheMap) -> Result<(), CacheError> {
        let mut state = self.lock();
        state.persist_count += 1;
        if state.fail_persist {
            return Err(CacheError::Unavailable("memory store persist disabled".into()));
        }
        state.entries = entries.clone();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
