// Cache stores for reading and writing cached API responses.
// Handles JSON serialization, TTL checking, and filesystem operations.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ReportError, Result};

use super::key::CacheKey;
use super::paths;

/// Durable keyed storage with per-entry time-to-live.
///
/// A missing or expired entry is `Ok(None)`; errors are reserved for a store
/// that cannot be read or written. A TTL of zero means the entry never expires.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>>;
    async fn set(&self, key: &CacheKey, value: &Value, ttl_secs: u64) -> Result<()>;
}

/// Wrapper for a cached value with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData {
    /// The cached data.
    pub data: Value,
    /// When the data was cached.
    pub cached_at: DateTime<Utc>,
    /// Retention in seconds, zero for no expiry.
    pub ttl_secs: u64,
}

impl CachedData {
    pub fn new(data: Value, ttl_secs: u64) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
            ttl_secs,
        }
    }

    /// Check if this cached data has expired.
    pub fn is_expired(&self) -> bool {
        if self.ttl_secs == 0 {
            return false;
        }

        let elapsed = Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        elapsed >= Duration::from_secs(self.ttl_secs)
    }
}

/// File-backed store: one JSON document per entry, named by key digest.
/// Only the digest reaches the disk, never the key text.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base/namespace`. The directory is created lazily.
    pub fn new(base: &Path, namespace: &str) -> Self {
        Self {
            dir: paths::namespace_dir(base, namespace),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        paths::entry_path(&self.dir, &key.digest())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let cached = run_blocking(move || read_cached(&path)).await?;
        match cached {
            Some(cached) if !cached.is_expired() => Ok(Some(cached.data)),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: &Value, ttl_secs: u64) -> Result<()> {
        let path = self.path_for(key);
        let cached = CachedData::new(value.clone(), ttl_secs);
        run_blocking(move || write_cached(&path, &cached)).await
    }
}

/// Run filesystem work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ReportError::Store(format!("cache I/O task failed: {}", e)))?
}

/// Read a cached entry from a file.
pub fn read_cached(path: &Path) -> Result<Option<CachedData>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let cached: CachedData = serde_json::from_str(&contents)?;
    Ok(Some(cached))
}

/// Write a cached entry as JSON.
pub fn write_cached(path: &Path, cached: &CachedData) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(cached)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

struct MemoryEntry {
    value: Value,
    expires_at: Option<Instant>,
}

/// In-process store. Entries vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ReportError::Store("memory store lock poisoned".into()))?;

        let expired = match entries.get(key.as_str()) {
            None => return Ok(None),
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Instant::now()),
        };
        if expired {
            entries.remove(key.as_str());
            return Ok(None);
        }
        Ok(entries.get(key.as_str()).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &CacheKey, value: &Value, ttl_secs: u64) -> Result<()> {
        // A TTL past the end of the clock behaves like no expiry.
        let expires_at = match ttl_secs {
            0 => None,
            secs => Instant::now().checked_add(Duration::from_secs(secs)),
        };
        self.entries
            .lock()
            .map_err(|_| ReportError::Store("memory store lock poisoned".into()))?
            .insert(
                key.as_str().to_string(),
                MemoryEntry {
                    value: value.clone(),
                    expires_at,
                },
            );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use tempfile::TempDir;

    fn key(route: &str) -> CacheKey {
        CacheKey::for_request(route, &Map::new(), "").unwrap()
    }

    #[tokio::test]
    async fn test_file_store_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "test");
        let value = json!({"data": [{"login": "octocat"}], "nested": {"a": [1, 2]}});

        store.set(&key("GET /a"), &value, 60).await.unwrap();

        assert_eq!(store.get(&key("GET /a")).await.unwrap(), Some(value));
        assert!(store.dir().ends_with("test"));
    }

    #[tokio::test]
    async fn test_file_store_miss_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "test");

        assert_eq!(store.get(&key("GET /missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_expired_entry_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "test");
        let k = key("GET /old");

        let mut cached = CachedData::new(json!(1), 60);
        cached.cached_at = Utc::now() - chrono::Duration::seconds(120);
        write_cached(&store.path_for(&k), &cached).unwrap();

        assert_eq!(store.get(&k).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_does_not_persist_key_text() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "test");
        let k = CacheKey::for_request("GET /user", &Map::new(), "secret-token").unwrap();

        store.set(&k, &json!({"login": "octocat"}), 60).await.unwrap();

        let written = fs::read_to_string(store.path_for(&k)).unwrap();
        assert!(!written.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_entry_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "test");
        let k = key("GET /corrupt");
        let path = store.path_for(&k);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(store.get(&k).await, Err(ReportError::Json(_))));
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let mut data = CachedData::new(json!(null), 0);
        data.cached_at = Utc::now() - chrono::Duration::days(365);
        assert!(!data.is_expired());
    }

    #[test]
    fn test_ttl_expires() {
        let mut data = CachedData::new(json!(null), 300);
        assert!(!data.is_expired());
        data.cached_at = Utc::now() - chrono::Duration::seconds(600);
        assert!(data.is_expired());
    }

    #[tokio::test]
    async fn test_memory_store_huge_ttl_never_expires() {
        let store = MemoryStore::new();
        let k = key("GET /a");

        store.set(&k, &json!(1), u64::MAX).await.unwrap();

        assert_eq!(store.get(&k).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_file_store_huge_ttl_never_expires() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "test");
        let k = key("GET /a");

        store.set(&k, &json!(1), u64::MAX).await.unwrap();

        assert_eq!(store.get(&k).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip_and_expiry() {
        let store = MemoryStore::new();
        let k = key("GET /a");
        assert!(store.is_empty());

        store.set(&k, &json!({"x": 1}), 3600).await.unwrap();
        assert_eq!(store.get(&k).await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(store.len(), 1);

        let short = key("GET /short");
        store.set(&short, &json!(2), 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get(&short).await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }
}
