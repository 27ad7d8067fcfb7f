use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info};

use crate::cache::token::IssuedToken;
use crate::cache::token_cache::TokenCache;
use crate::config::sources::AuthConfig;
use crate::errors::{truncate_body, AgentError, AgentResult};
use crate::helpers::time::{get_instant, remaining_seconds_floored};
use crate::observability::metrics::get_metrics;

/// A cached token is reused only while it outlives this margin.
pub const FRESHNESS_MARGIN_SECONDS: i64 = 60;

static ERROR_MSG: &str = "error";
static SUCCESS_MSG: &str = "success";

/// Client-credentials exchange in front of a [`TokenCache`].
#[derive(Debug, Clone)]
pub struct TokenAcquirer {
    client: Client,
    auth: AuthConfig,
    cache: TokenCache,
}

impl TokenAcquirer {
    pub fn new(client: Client, auth: AuthConfig, cache: TokenCache) -> Self {
        Self { client, auth, cache }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Return the cached token while it is fresh, otherwise exchange for a new one.
    ///
    /// Every return reports `expires_in` floored at the freshness margin; the cache
    /// keeps the real expiry, so a token shorter than the margin is never reused.
    /// There is no refresh lock: callers racing on a cold cache each run an exchange.
    pub async fn acquire_or_refresh(&self) -> AgentResult<IssuedToken> {
        if let Some(token) = self
            .cache
            .get()
            .await
            .filter(|token| token.is_fresh(FRESHNESS_MARGIN_SECONDS))
        {
            get_metrics().await.token_cache_hits.inc();
            return Ok(IssuedToken {
                expires_in: remaining_seconds_floored(token.expires_at_ms, FRESHNESS_MARGIN_SECONDS as u64),
                access_token: token.access_token,
            });
        }
        let issued = self.refresh().await?;
        Ok(IssuedToken {
            expires_in: issued.expires_in.max(FRESHNESS_MARGIN_SECONDS as u64),
            ..issued
        })
    }

    /// Unconditional exchange; the result replaces the cached token.
    pub async fn refresh(&self) -> AgentResult<IssuedToken> {
        let metrics = get_metrics().await;
        let start = get_instant();

        let result = self.exchange().await;
        let label = if result.is_ok() { SUCCESS_MSG } else { ERROR_MSG };
        metrics.token_exchanges.with_label_values(&[label]).inc();
        metrics
            .token_exchange_duration
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        let issued = result?;
        let cached = self.cache.set(issued.access_token.clone(), issued.expires_in).await;
        metrics.token_expiry_unix.set(cached.expires_at_ms / 1000);
        info!(expires_in = issued.expires_in, "token acquired");
        Ok(issued)
    }

    async fn exchange(&self) -> AgentResult<IssuedToken> {
        let endpoint = redact_scheme(&self.auth.token_url);
        info!(endpoint = %endpoint, basic_auth = self.auth.has_secret(), "token request");

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "client_credentials"),
            ("scope", self.auth.scope.as_str()),
        ];
        let mut request = self
            .client
            .post(&self.auth.token_url)
            .header(ACCEPT, "application/json");

        // some authorization servers reject Basic auth for clients without a secret
        if self.auth.has_secret() {
            let credentials = STANDARD.encode(format!("{}:{}", self.auth.client_id, self.auth.client_secret));
            request = request.header(AUTHORIZATION, format!("Basic {}", credentials));
        } else {
            form.push(("client_id", self.auth.client_id.as_str()));
            form.push(("client_secret", self.auth.client_secret.as_str()));
        }

        let response = request.form(&form).send().await.map_err(|err| {
            error!(endpoint = %endpoint, "token request failed: {}", err);
            AgentError::TokenTransport { status: None, message: err.to_string() }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            error!(endpoint = %endpoint, status = status.as_u16(), "token response unreadable: {}", err);
            AgentError::TokenTransport { status: Some(status.as_u16()), message: err.to_string() }
        })?;

        if !status.is_success() {
            let prefix = truncate_body(&body);
            error!(endpoint = %endpoint, status = status.as_u16(), body = %prefix, "token endpoint rejected request");
            return Err(AgentError::TokenTransport { status: Some(status.as_u16()), message: prefix });
        }

        parse_token_response(&body).inspect_err(|err| {
            error!(endpoint = %endpoint, body = %truncate_body(&body), "token response invalid: {}", err);
        })
    }
}

/// Decode `{access_token, expires_in}` from a fully read response body.
pub fn parse_token_response(body: &str) -> AgentResult<IssuedToken> {
    let value: Value = serde_json::from_str(body).map_err(|err| AgentError::TokenParse(err.to_string()))?;

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AgentError::TokenShape("access_token is missing or empty".to_string()))?;

    let expires_in = value
        .get("expires_in")
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .ok_or_else(|| AgentError::TokenShape("expires_in is missing or not positive".to_string()))?;

    Ok(IssuedToken {
        access_token: access_token.to_owned(),
        expires_in: expires_in.floor().max(1.0) as u64,
    })
}

/// Endpoint for logs: scheme and any userinfo removed.
pub fn redact_scheme(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let (authority, path) = match without_scheme.find('/') {
        Some(idx) => without_scheme.split_at(idx),
        None => (without_scheme, ""),
    };
    let host = authority.rsplit_once('@').map(|(_, host)| host).unwrap_or(authority);
    format!("{}{}", host, path)
}
