use crate::helpers::time::now_millis;

/// Application access token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at_ms: i64, // UNIX TIMESTAMP, milliseconds
}

impl CachedToken {
    pub fn new(access_token: String, expires_at_ms: i64) -> Self {
        Self { access_token, expires_at_ms }
    }

    /// Milliseconds left before expiry, negative once expired.
    pub fn remaining_ms(&self) -> i64 {
        self.expires_at_ms - now_millis()
    }

    /// True when the token outlives `margin_seconds` from now.
    pub fn is_fresh(&self, margin_seconds: i64) -> bool {
        self.remaining_ms() > margin_seconds * 1000
    }
}

/// Token as handed to callers: value plus whole seconds of lifetime.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}
