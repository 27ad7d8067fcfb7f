use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::token::CachedToken;
use crate::helpers::time::now_millis;

/// Single-slot token holder shared by every request task.
///
/// Clones share the slot. The lock guards only the slot swap and is never held
/// across a token exchange, so concurrent refreshes race and the last write wins.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(None)) }
    }

    /// Current token, expired or not. Freshness is the caller's decision.
    pub async fn get(&self) -> Option<CachedToken> {
        self.inner.read().await.clone()
    }

    /// Replace the slot with `access_token` living `ttl_seconds` from now.
    pub async fn set(&self, access_token: String, ttl_seconds: u64) -> CachedToken {
        let expires_at_ms = now_millis() + (ttl_seconds as i64).saturating_mul(1000);
        let token = CachedToken::new(access_token, expires_at_ms);
        self.put(token.clone()).await;
        token
    }

    /// Replace the slot with a prepared token.
    pub async fn put(&self, token: CachedToken) {
        *self.inner.write().await = Some(token);
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_none()
    }
}
