use http::header::COOKIE;
use http::HeaderMap;

use crate::config::pipeline::ProxyConfig;

/// Names the cookie that carries the caller token.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

impl SessionCookie {
    pub fn from_config(cfg: &ProxyConfig) -> Self {
        Self { name: cfg.cookie_name.clone(), secure: cfg.secure_cookie }
    }

    /// Token from the request cookies, if present and non-empty.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
    }

    /// `Set-Cookie` value storing `token` for `max_age_seconds`.
    pub fn issue(&self, token: &str, max_age_seconds: u64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.name, token, max_age_seconds, secure
        )
    }
}
