use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::error;

/// Safety margin subtracted from a token's validity window so a token that
/// would expire mid-flight is treated as stale.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// A short-lived access token together with its validity window, as written
/// by the rotation manager after a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_in: i64,
    pub timestamp: i64,
}

impl CachedToken {
    /// A token is fresh iff `timestamp + expires_in - SKEW > now`.
    pub fn is_fresh(&self, now: i64) -> bool {
        self.timestamp + self.expires_in - EXPIRY_SKEW_SECS > now
    }
}

/// Shared token store, one entry per credential-pool index. Entries are
/// only ever created or overwritten; concurrent refreshes may race and the
/// last writer wins.
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, index: usize) -> Option<CachedToken>;
    async fn put(&self, index: usize, token: &CachedToken);
}

fn cache_key(index: usize) -> String {
    format!("token_{index}")
}

/// In-memory cache, used in tests and as a fallback when no durable path
/// is configured.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<usize, CachedToken>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, index: usize) -> Option<CachedToken> {
        self.entries.read().await.get(&index).cloned()
    }

    async fn put(&self, index: usize, token: &CachedToken) {
        self.entries.write().await.insert(index, token.clone());
    }
}

/// Durable cache backed by a single JSON object file keyed `token_<index>`,
/// so cached tokens survive process restarts. Read/write failures are
/// logged and reported as cache misses; they never fail the request.
#[derive(Debug)]
pub struct FileTokenCache {
    path: PathBuf,
    // Serializes file access within this process only.
    lock: RwLock<()>,
}

impl FileTokenCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: RwLock::new(()),
        }
    }

    async fn read_entries(&self) -> HashMap<String, CachedToken> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    error!(path = %self.path.display(), error = %err, "token cache file is malformed");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "failed to read token cache file");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn get(&self, index: usize) -> Option<CachedToken> {
        let _guard = self.lock.read().await;
        self.read_entries().await.remove(&cache_key(index))
    }

    async fn put(&self, index: usize, token: &CachedToken) {
        let _guard = self.lock.write().await;
        let mut entries = self.read_entries().await;
        entries.insert(cache_key(index), token.clone());
        if let Some(parent) = self.path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                error!(path = %self.path.display(), error = %err, "failed to create token cache directory");
                return;
            }
        }
        let encoded = match serde_json::to_string_pretty(&entries) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(error = %err, "failed to encode token cache");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(&self.path, encoded).await {
            error!(path = %self.path.display(), error = %err, "failed to write token cache file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(timestamp: i64, expires_in: i64) -> CachedToken {
        CachedToken {
            access_token: "ya29.test".to_string(),
            expires_in,
            timestamp,
        }
    }

    #[test]
    fn freshness_flips_exactly_at_the_skew_boundary() {
        let cached = token(1_000, 3_600);
        // Fresh while now < timestamp + expires_in - 60 = 4540.
        assert!(cached.is_fresh(4_539));
        assert!(!cached.is_fresh(4_540));
        assert!(!cached.is_fresh(4_541));
    }

    #[tokio::test]
    async fn memory_cache_overwrites_per_index() {
        let cache = MemoryTokenCache::new();
        assert!(cache.get(0).await.is_none());
        cache.put(0, &token(1, 10)).await;
        cache.put(0, &token(2, 20)).await;
        cache.put(1, &token(3, 30)).await;
        assert_eq!(cache.get(0).await.unwrap().timestamp, 2);
        assert_eq!(cache.get(1).await.unwrap().timestamp, 3);
    }

    #[tokio::test]
    async fn file_cache_round_trips_keyed_by_index() {
        let path = std::env::temp_dir().join(format!(
            "agproxy-token-cache-{}-roundtrip.json",
            std::process::id()
        ));
        let _ = tokio::fs::remove_file(&path).await;

        let cache = FileTokenCache::new(path.clone());
        assert!(cache.get(0).await.is_none());
        cache.put(0, &token(5, 50)).await;
        cache.put(3, &token(7, 70)).await;

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let entries: HashMap<String, CachedToken> = serde_json::from_str(&raw).unwrap();
        assert!(entries.contains_key("token_0"));
        assert!(entries.contains_key("token_3"));

        // A fresh handle over the same file sees the durable entries.
        let reopened = FileTokenCache::new(path.clone());
        assert_eq!(reopened.get(3).await.unwrap().timestamp, 7);
        assert!(reopened.get(1).await.is_none());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
