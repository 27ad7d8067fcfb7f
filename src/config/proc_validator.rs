//! Eager configuration validation.
//! - required credentials and endpoints are collected into one `ConfigMissing`
//! - shape problems (page size, allow-list, paths) become `BadRequest`

use tracing::{error, info};

use crate::config::sources::ServiceConfig;
use crate::errors::{AgentError, AgentResult};

pub fn validate_service_config(cfg: &ServiceConfig) -> AgentResult<()> {
    let missing = missing_required(cfg);
    if !missing.is_empty() {
        error!("config: required values are absent: {:?}", missing);
        return Err(AgentError::ConfigMissing(missing));
    }

    let mut errors: Vec<String> = Vec::new();

    if !cfg.auth.token_url.starts_with("http://") && !cfg.auth.token_url.starts_with("https://") {
        errors.push("auth.token_url must be an http(s) url".to_string());
    }
    if !cfg.upstream.base_url.starts_with("http://") && !cfg.upstream.base_url.starts_with("https://") {
        errors.push("upstream.base_url must be an http(s) url".to_string());
    }
    if cfg.sync.page_size == 0 {
        errors.push("sync.page_size must be greater than 0".to_string());
    }
    if cfg.sync.interval_seconds == Some(0) {
        errors.push("sync.interval_seconds must be greater than 0".to_string());
    }
    if cfg.proxy.allowed_prefixes.iter().all(|p| p.trim_matches('/').is_empty()) {
        errors.push("proxy.allowed_prefixes must contain at least one non-empty prefix".to_string());
    }
    if cfg.proxy.cookie_name.is_empty() {
        errors.push("proxy.cookie_name must not be empty".to_string());
    }
    if let Some(retry) = &cfg.settings.retry {
        if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
            if max < base {
                errors.push("settings.retry.max_delay_ms must be >= base_delay_ms".to_string());
            }
        }
    }

    if errors.is_empty() {
        info!("config: validation passed");
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(AgentError::BadRequest(errors.join("; ")))
    }
}

fn missing_required(cfg: &ServiceConfig) -> Vec<String> {
    [
        ("auth.token_url", cfg.auth.token_url.as_str()),
        ("auth.client_id", cfg.auth.client_id.as_str()),
        ("upstream.base_url", cfg.upstream.base_url.as_str()),
        ("upstream.api_key", cfg.upstream.api_key.as_str()),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name.to_string())
    .collect()
}
