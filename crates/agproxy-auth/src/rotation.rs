use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cache::{CachedToken, TokenCache};
use crate::credential::{Credential, CredentialConfig};
use crate::refresh::TokenExchanger;

/// Round-robin credential rotation: scans the pool from index 0 on every
/// call, serving cached tokens while fresh and refreshing stale ones,
/// failing over to the next credential when a refresh fails.
///
/// Deliberately no backoff, no circuit breaker, and no locking around the
/// check -> refresh -> cache-write sequence: concurrent requests may both
/// refresh the same credential and the last write wins.
pub struct RotationManager {
    pool: Vec<CredentialConfig>,
    cache: Arc<dyn TokenCache>,
    exchanger: Arc<dyn TokenExchanger>,
}

impl RotationManager {
    pub fn new(
        pool: Vec<CredentialConfig>,
        cache: Arc<dyn TokenCache>,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Self {
        Self {
            pool,
            cache,
            exchanger,
        }
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn enabled_len(&self) -> usize {
        self.pool.iter().filter(|entry| !entry.disabled).count()
    }

    /// Returns a credential merged with a live access token, or `None` when
    /// every credential is disabled or every refresh attempt failed. A
    /// failing credential is not retried within one call, but is tried
    /// again on the next.
    pub async fn get_token(&self) -> Option<Credential> {
        for (index, entry) in self.pool.iter().enumerate() {
            if entry.disabled {
                continue;
            }

            let now = OffsetDateTime::now_utc().unix_timestamp();
            if let Some(cached) = self.cache.get(index).await {
                if cached.is_fresh(now) {
                    debug!(index, "using cached access token");
                    return Some(merge(index, entry, cached));
                }
            }

            match self.exchanger.exchange(&entry.refresh_token).await {
                Ok(token) => {
                    self.cache.put(index, &token).await;
                    debug!(index, "refreshed access token");
                    return Some(merge(index, entry, token));
                }
                Err(err) => {
                    warn!(index, error = %err, "token refresh failed, trying next credential");
                }
            }
        }
        None
    }
}

fn merge(index: usize, entry: &CredentialConfig, token: CachedToken) -> Credential {
    Credential {
        index,
        access_token: token.access_token,
        project_id: entry.project_id.clone(),
        session_id: entry.session_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use http::StatusCode;

    use super::*;
    use crate::cache::MemoryTokenCache;
    use crate::refresh::RefreshError;

    struct StubExchanger {
        // Outcome per refresh secret; tokens are minted with a far-future
        // validity so they stay fresh for the test's duration.
        failing: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl StubExchanger {
        fn new(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for StubExchanger {
        async fn exchange(&self, refresh_token: &str) -> Result<CachedToken, RefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&refresh_token) {
                return Err(RefreshError::Rejected {
                    status: StatusCode::BAD_REQUEST,
                    body: "invalid_grant".to_string(),
                });
            }
            Ok(CachedToken {
                access_token: format!("token-for-{refresh_token}"),
                expires_in: 3_600,
                timestamp: OffsetDateTime::now_utc().unix_timestamp(),
            })
        }
    }

    fn entry(refresh_token: &str) -> CredentialConfig {
        CredentialConfig {
            refresh_token: refresh_token.to_string(),
            disabled: false,
            project_id: None,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn empty_pool_returns_none() {
        let manager = RotationManager::new(
            Vec::new(),
            Arc::new(MemoryTokenCache::new()),
            Arc::new(StubExchanger::new(Vec::new())),
        );
        assert!(manager.get_token().await.is_none());
    }

    #[tokio::test]
    async fn all_disabled_pool_returns_none_without_exchanges() {
        let mut first = entry("rt-a");
        first.disabled = true;
        let mut second = entry("rt-b");
        second.disabled = true;
        let exchanger = Arc::new(StubExchanger::new(Vec::new()));
        let manager = RotationManager::new(
            vec![first, second],
            Arc::new(MemoryTokenCache::new()),
            exchanger.clone(),
        );
        assert!(manager.get_token().await.is_none());
        assert_eq!(exchanger.calls(), 0);
    }

    #[tokio::test]
    async fn fails_over_to_next_credential_without_retrying() {
        let exchanger = Arc::new(StubExchanger::new(vec!["rt-a"]));
        let manager = RotationManager::new(
            vec![entry("rt-a"), entry("rt-b")],
            Arc::new(MemoryTokenCache::new()),
            exchanger.clone(),
        );
        let credential = manager.get_token().await.unwrap();
        assert_eq!(credential.index, 1);
        assert_eq!(credential.access_token, "token-for-rt-b");
        // One attempt per credential, no same-call retry of the failure.
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn every_refresh_failing_returns_none() {
        let exchanger = Arc::new(StubExchanger::new(vec!["rt-a", "rt-b"]));
        let manager = RotationManager::new(
            vec![entry("rt-a"), entry("rt-b")],
            Arc::new(MemoryTokenCache::new()),
            exchanger.clone(),
        );
        assert!(manager.get_token().await.is_none());
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn fresh_cached_token_short_circuits_the_exchange() {
        let cache = Arc::new(MemoryTokenCache::new());
        cache
            .put(
                0,
                &CachedToken {
                    access_token: "cached".to_string(),
                    expires_in: 3_600,
                    timestamp: OffsetDateTime::now_utc().unix_timestamp(),
                },
            )
            .await;
        let exchanger = Arc::new(StubExchanger::new(Vec::new()));
        let manager = RotationManager::new(vec![entry("rt-a")], cache, exchanger.clone());
        let credential = manager.get_token().await.unwrap();
        assert_eq!(credential.access_token, "cached");
        assert_eq!(exchanger.calls(), 0);
    }

    #[tokio::test]
    async fn stale_cached_token_is_refreshed_and_overwritten() {
        let cache = Arc::new(MemoryTokenCache::new());
        cache
            .put(
                0,
                &CachedToken {
                    access_token: "stale".to_string(),
                    expires_in: 30,
                    timestamp: OffsetDateTime::now_utc().unix_timestamp() - 120,
                },
            )
            .await;
        let exchanger = Arc::new(StubExchanger::new(Vec::new()));
        let manager = RotationManager::new(vec![entry("rt-a")], cache.clone(), exchanger.clone());
        let credential = manager.get_token().await.unwrap();
        assert_eq!(credential.access_token, "token-for-rt-a");
        assert_eq!(exchanger.calls(), 1);
        assert_eq!(cache.get(0).await.unwrap().access_token, "token-for-rt-a");
    }

    #[tokio::test]
    async fn disabled_credentials_are_skipped_in_pool_order() {
        let mut first = entry("rt-a");
        first.disabled = true;
        let mut second = entry("rt-b");
        second.project_id = Some("proj-9".to_string());
        second.session_id = Some("sess-9".to_string());
        let exchanger = Arc::new(StubExchanger::new(Vec::new()));
        let manager = RotationManager::new(
            vec![first, second],
            Arc::new(MemoryTokenCache::new()),
            exchanger.clone(),
        );
        let credential = manager.get_token().await.unwrap();
        assert_eq!(credential.index, 1);
        assert_eq!(credential.project_id.as_deref(), Some("proj-9"));
        assert_eq!(credential.session_id.as_deref(), Some("sess-9"));
        assert_eq!(exchanger.calls(), 1);
    }
}
