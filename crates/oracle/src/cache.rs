use log::{debug, warn};
use scribe_protocol::unix_ms_now;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;

use crate::error::Result;

/// Bumped whenever [`CacheEnvelope`] changes shape.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const ENTRY_EXTENSION: &str = "json";

#[derive(Serialize, Deserialize, Debug)]
struct CacheEnvelope {
    schema_version: u32,
    created_ms: u64,
    payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 before any lookup
    pub hit_rate: f64,
    pub entries: u64,
    pub total_bytes: u64,
}

/// Content-addressed, TTL-bounded store of completion replies, one JSON file
/// per entry.
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// SHA-256 hex of `prompt::context`.
    pub fn key(prompt: &str, context: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update(b"::");
        hasher.update(context.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    /// Look up a fresh entry. Expired or unreadable entries are removed and
    /// count as misses.
    pub async fn get(&self, prompt: &str, context: &str) -> Option<String> {
        let key = Self::key(prompt, context);
        let path = self.entry_path(&key);

        let Ok(bytes) = fs::read(&path).await else {
            return self.miss();
        };

        let envelope: CacheEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Response cache entry corrupted {}: {err}", path.display());
                self.discard(&path).await;
                return self.miss();
            }
        };

        if envelope.schema_version != CACHE_SCHEMA_VERSION {
            debug!(
                "dropping cache entry {key} with schema version {}",
                envelope.schema_version
            );
            self.discard(&path).await;
            return self.miss();
        }

        let age = unix_ms_now().saturating_sub(envelope.created_ms);
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        if age >= ttl_ms {
            debug!("cache entry {key} expired ({age} ms old)");
            self.discard(&path).await;
            return self.miss();
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(envelope.payload)
    }

    /// Store `payload`, replacing any previous entry for the same key.
    pub async fn set(&self, prompt: &str, context: &str, payload: &str) -> Result<()> {
        self.write_entry(&Self::key(prompt, context), unix_ms_now(), payload)
            .await
    }

    async fn write_entry(&self, key: &str, created_ms: u64, payload: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let envelope = CacheEnvelope {
            schema_version: CACHE_SCHEMA_VERSION,
            created_ms,
            payload: payload.to_string(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Delete every entry and reset the hit/miss counters. Returns the number
    /// of entries removed.
    pub async fn clear(&self) -> Result<u64> {
        let mut removed = 0;
        for (path, _) in self.entries().await? {
            fs::remove_file(&path).await?;
            removed += 1;
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        let entries = self.entries().await?;
        Ok(CacheStats {
            hits,
            misses,
            hit_rate,
            entries: entries.len() as u64,
            total_bytes: entries.iter().map(|(_, len)| len).sum(),
        })
    }

    async fn entries(&self) -> Result<Vec<(PathBuf, u64)>> {
        let mut out = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                out.push((path, meta.len()));
            }
        }
        Ok(out)
    }

    fn miss(&self) -> Option<String> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn discard(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path).await {
            warn!("Failed to remove cache entry {}: {err}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cache(dir: &TempDir) -> ResponseCache {
        ResponseCache::new(dir.path().join("cache"), DEFAULT_CACHE_TTL)
    }

    #[tokio::test]
    async fn set_then_get_counts_hit() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);

        cache.set("prompt", "ctx", "reply").await.unwrap();
        assert_eq!(cache.get("prompt", "ctx").await.as_deref(), Some("reply"));
        assert_eq!(cache.get("prompt", "other").await, None);

        let stats = cache.stats().await.unwrap();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        assert!(stats.total_bytes > 0);
    }

    #[tokio::test]
    async fn expired_entry_is_removed_and_counts_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let key = ResponseCache::key("p", "c");
        let eight_days_ago = unix_ms_now() - 8 * 24 * 60 * 60 * 1000;
        cache.write_entry(&key, eight_days_ago, "stale").await.unwrap();

        assert_eq!(cache.get("p", "c").await, None);
        assert!(!cache.entry_path(&key).exists());
        let stats = cache.stats().await.unwrap();
        assert_eq!((stats.hits, stats.misses, stats.entries), (0, 1, 0));
    }

    #[tokio::test]
    async fn unknown_schema_version_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let key = ResponseCache::key("p", "");
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(
            cache.entry_path(&key),
            r#"{"schema_version":99,"created_ms":0,"payload":"x"}"#,
        )
        .unwrap();

        assert_eq!(cache.get("p", "").await, None);
        assert!(!cache.entry_path(&key).exists());
    }

    #[tokio::test]
    async fn corrupted_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.entry_path(&ResponseCache::key("p", "")), b"{not json").unwrap();

        assert_eq!(cache.get("p", "").await, None);
        assert_eq!(cache.stats().await.unwrap().misses, 1);
    }

    #[tokio::test]
    async fn clear_removes_entries_and_resets_counters() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.set("a", "", "1").await.unwrap();
        cache.set("b", "", "2").await.unwrap();
        let _ = cache.get("a", "").await;

        assert_eq!(cache.clear().await.unwrap(), 2);
        let stats = cache.stats().await.unwrap();
        assert_eq!(
            stats,
            CacheStats {
                hits: 0,
                misses: 0,
                hit_rate: 0.0,
                entries: 0,
                total_bytes: 0
            }
        );
    }

    #[test]
    fn key_separates_prompt_and_context() {
        assert_ne!(ResponseCache::key("ab", "c"), ResponseCache::key("a", "bc"));
        assert_eq!(ResponseCache::key("a", "b").len(), 64);
    }
}
