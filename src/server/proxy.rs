use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{AgentError, AgentResult};
use crate::observability::metrics::get_metrics;
use crate::sources::upstream::{RawResponse, UpstreamClient};

pub type ProxyResponse = RawResponse;

/// Forwards caller requests to allow-listed upstream paths only.
#[derive(Debug, Clone)]
pub struct RequestProxy {
    upstream: UpstreamClient,
    allowed_prefixes: Arc<Vec<String>>,
}

impl RequestProxy {
    pub fn new(upstream: UpstreamClient, allowed_prefixes: Vec<String>) -> Self {
        let allowed_prefixes = allowed_prefixes
            .into_iter()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { upstream, allowed_prefixes: Arc::new(allowed_prefixes) }
    }

    /// Relay one GET. Status, content type and body come back exactly as upstream sent them.
    pub async fn proxy(&self, path: &str, caller_token: Option<&str>) -> AgentResult<ProxyResponse> {
        let metrics = get_metrics().await;

        let Some(token) = caller_token.filter(|t| !t.is_empty()) else {
            metrics.proxy_requests.with_label_values(&["unauthorized"]).inc();
            return Err(AgentError::Unauthorized);
        };
        let target = self.validate_path(path).inspect_err(|err| {
            metrics.proxy_requests.with_label_values(&["bad_request"]).inc();
            warn!("proxy rejected path: {}", err);
        })?;

        match self.upstream.fetch_raw(&target, token).await {
            Ok(response) => {
                metrics.proxy_requests.with_label_values(&["forwarded"]).inc();
                info!(status = response.status, "proxied {}", target);
                Ok(response)
            }
            Err(err) => {
                metrics.proxy_requests.with_label_values(&["error"]).inc();
                Err(err)
            }
        }
    }

    /// Normalized relative path (leading slashes removed) if it is safe and allow-listed.
    pub fn validate_path(&self, path: &str) -> AgentResult<String> {
        if path.starts_with("//") {
            return Err(AgentError::BadRequest(format!("protocol-relative path '{}'", path)));
        }
        let relative = path.trim_start_matches('/');
        let route = relative.split(['?', '#']).next().unwrap_or(relative);
        let lowered = route.to_ascii_lowercase();

        if relative.is_empty()
            || relative.contains("://")
            || route.contains('\\')
            || route.split('/').any(|segment| segment == "..")
            || lowered.contains("%2e")
            || lowered.contains("%2f")
            || lowered.contains("%5c")
            || relative.chars().any(|c| c.is_control() || c.is_whitespace())
        {
            return Err(AgentError::BadRequest(format!("malformed upstream path '{}'", path)));
        }

        if !self.allowed_prefixes.iter().any(|prefix| matches_prefix(route, prefix)) {
            return Err(AgentError::BadRequest(format!("path '{}' is not allow-listed", route)));
        }
        Ok(relative.to_string())
    }
}

fn matches_prefix(route: &str, prefix: &str) -> bool {
    route == prefix
        || route
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
