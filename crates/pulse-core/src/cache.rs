//! Workspace-scoped cache for slow-changing lookups (pipeline and repository
//! lists).
//!
//! A cache never fails the caller: read and write problems are logged and
//! behave like a miss.

use crate::io;
use crate::paths;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_TTL_MINUTES: u32 = 60;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: &Value);
    fn invalidate(&self, key: &str);
}

/// `<workspace-id>/<name>`
pub fn cache_key(workspace_id: &str, name: &str) -> String {
    format!("{workspace_id}/{name}")
}

// ---------------------------------------------------------------------------
// FileCache
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    fetched_at: DateTime<Utc>,
    value: Value,
}

/// One JSON file per key under a cache directory. Entries older than the TTL
/// read as misses.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: TimeDelta,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: TimeDelta) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn with_ttl_minutes(dir: impl Into<PathBuf>, minutes: u32) -> Self {
        Self::new(dir, TimeDelta::minutes(i64::from(minutes)))
    }

    fn path(&self, key: &str) -> PathBuf {
        paths::cache_file(&self.dir, key)
    }

    fn read(&self, key: &str, now: DateTime<Utc>) -> crate::Result<Option<Value>> {
        let Some(raw) = io::read_if_exists(&self.path(key))? else {
            return Ok(None);
        };
        let entry: Entry = serde_json::from_str(&raw)?;
        if now - entry.fetched_at > self.ttl {
            debug!(key, "cache entry expired");
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn write(&self, key: &str, value: &Value) -> crate::Result<()> {
        let entry = Entry {
            fetched_at: Utc::now(),
            value: value.clone(),
        };
        let data = serde_json::to_vec(&entry)?;
        io::atomic_write(&self.path(key), &data)
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        match self.read(key, Utc::now()) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &Value) {
        if let Err(e) = self.write(key, value) {
            warn!(key, error = %e, "cache write failed");
        }
    }

    fn invalidate(&self, key: &str) {
        if let Err(e) = io::remove_if_exists(&self.path(key)) {
            warn!(key, error = %e, "cache invalidate failed");
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// Process-local cache. Used with `--no-cache` and in tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &Value) {
        self.entries().insert(key.to_string(), value.clone());
    }

    fn invalidate(&self, key: &str) {
        self.entries().remove(key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
