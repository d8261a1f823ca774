//! Content cache over a key-value seam.
//!
//! The cache is best-effort on every path: store failures read as misses,
//! corrupt entries are evicted and read as misses, and writes that fail or
//! exceed the size bound are skipped with a log line. Nothing in here is
//! ever allowed to fail a scrape.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::types::ScrapedContent;

/// Characters of the URL kept in the readable part of the cache key.
const CACHE_KEY_PREFIX_CHARS: usize = 200;

/// Opaque key-value contract shared by the content cache and the
/// conversation store. Values are strings; `set` carries a TTL.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;
    async fn del(&self, key: &str) -> anyhow::Result<()>;
}

/// In-process store with per-entry expiry. Concurrent readers/writers on
/// the same key are last-write-wins, which is all the cache contract needs.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
}

struct StoredValue {
    value: String,
    expires_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if Utc::now() < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Expired: drop the dead entry outside the read guard.
        self.entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::max_value());
        self.entries
            .insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Maps a URL to a previously extracted [`ScrapedContent`], bounded by TTL
/// and serialized size.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
    max_entry_bytes: usize,
}

impl ContentCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration, max_entry_bytes: usize) -> Self {
        Self {
            store,
            ttl,
            max_entry_bytes,
        }
    }

    /// Look up a live entry for `url`. Deserialization is typed; any shape
    /// mismatch evicts the bad entry and reads as a miss.
    pub async fn get(&self, url: &str) -> Option<ScrapedContent> {
        let key = cache_key(url);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(%url, "cache.miss");
                return None;
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "cache.read_error");
                return None;
            }
        };

        match serde_json::from_str::<ScrapedContent>(&raw) {
            Ok(content) => {
                tracing::debug!(%url, sections = content.sections.len(), "cache.hit");
                Some(content)
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "cache.corrupt_entry_evicted");
                if let Err(del_err) = self.store.del(&key).await {
                    tracing::debug!(%url, error = %del_err, "cache.evict_failed");
                }
                None
            }
        }
    }

    /// Stamp `cached_at` and store the content. Oversized entries and store
    /// failures are logged and skipped; the stamped content is still what
    /// the caller hands back.
    pub async fn put(&self, content: &mut ScrapedContent) {
        content.cached_at = Some(Utc::now());

        let serialized = match serde_json::to_string(content) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(url = %content.url, error = %err, "cache.serialize_failed");
                return;
            }
        };

        if serialized.len() > self.max_entry_bytes {
            tracing::warn!(
                url = %content.url,
                bytes = serialized.len(),
                max_bytes = self.max_entry_bytes,
                "cache.entry_too_large"
            );
            return;
        }

        let key = cache_key(&content.url);
        match self.store.set(&key, serialized, self.ttl).await {
            Ok(()) => {
                tracing::debug!(url = %content.url, ttl_secs = self.ttl.as_secs(), "cache.stored")
            }
            Err(err) => tracing::warn!(url = %content.url, error = %err, "cache.write_error"),
        }
    }
}

/// Derive the store key for a URL: a bounded readable prefix plus a short
/// digest of the full URL, so two long URLs sharing a prefix never collide.
fn cache_key(url: &str) -> String {
    let prefix: String = url.chars().take(CACHE_KEY_PREFIX_CHARS).collect();
    let digest = blake3::hash(url.as_bytes()).to_hex();
    format!("scrape:{prefix}:{}", &digest.as_str()[..16])
}
