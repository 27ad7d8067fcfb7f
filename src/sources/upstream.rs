use std::future::Future;

use axum::body::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::sources::UpstreamConfig;
use crate::errors::{truncate_body, AgentError, AgentResult};
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, status_class};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Anything able to GET a decoded JSON document from the game API.
pub trait FetchJson {
    fn fetch_json(
        &self,
        relative_path: &str,
        bearer_token: &str,
    ) -> impl Future<Output = AgentResult<Value>> + Send;
}

impl<T: FetchJson + Sync> FetchJson for &T {
    fn fetch_json(
        &self,
        relative_path: &str,
        bearer_token: &str,
    ) -> impl Future<Output = AgentResult<Value>> + Send {
        (**self).fetch_json(relative_path, bearer_token)
    }
}

/// Upstream response relayed without interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    cfg: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(client: Client, cfg: UpstreamConfig) -> Self {
        Self { client, cfg }
    }

    pub fn url_for(&self, relative_path: &str) -> String {
        join_url(&self.cfg.base_url, relative_path)
    }

    /// One GET, any status; the body is returned byte for byte.
    pub async fn fetch_raw(&self, relative_path: &str, bearer_token: &str) -> AgentResult<RawResponse> {
        let response = self.send(relative_path, bearer_token, "raw").await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|err| AgentError::UpstreamTransport(err.to_string()))?;
        Ok(RawResponse { status, content_type, body })
    }

    async fn send(&self, relative_path: &str, bearer_token: &str, kind: &str) -> AgentResult<Response> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let url = self.url_for(relative_path);
        debug!("upstream GET {}", relative_path);

        let result = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.cfg.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer_token))
            .header(USER_AGENT, &self.cfg.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .await;

        metrics
            .upstream_duration
            .with_label_values(&[kind])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                metrics
                    .upstream_requests
                    .with_label_values(&[status_class(response.status().as_u16())])
                    .inc();
                Ok(response)
            }
            Err(err) => {
                metrics.upstream_requests.with_label_values(&["transport"]).inc();
                error!("upstream GET {} failed: {}", relative_path, err);
                Err(AgentError::UpstreamTransport(err.to_string()))
            }
        }
    }
}

impl FetchJson for UpstreamClient {
    async fn fetch_json(&self, relative_path: &str, bearer_token: &str) -> AgentResult<Value> {
        let response = self.send(relative_path, bearer_token, "json").await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_prefix = truncate_body(&body);
            error!(status = status.as_u16(), body = %body_prefix, "upstream GET {} rejected", relative_path);
            return Err(AgentError::UpstreamHttp {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body_prefix,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| AgentError::UpstreamTransport(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| {
            error!(body = %truncate_body(&body), "upstream GET {} returned invalid JSON", relative_path);
            AgentError::UpstreamTransport(format!("invalid JSON from upstream: {}", err))
        })
    }
}

/// `base` without trailing slashes + `/` + `path` without leading slashes.
pub fn join_url(base: &str, relative_path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative_path.trim_start_matches('/')
    )
}
