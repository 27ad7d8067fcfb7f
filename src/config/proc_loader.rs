use std::{fs, path::Path};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::sources::ServiceConfig;
use crate::observability::metrics::get_metrics;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.config_errors.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config).inspect_err(|_| {
        metrics.config_errors.inc();
    })?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pipeline::DEFAULT_PAGE_SIZE;
    use crate::errors::AgentError;
    use serial_test::serial;

    const MINIMAL: &str = r#"
auth:
  token_url: https://auth.example.test/oauth2/token
  client_id: app
upstream:
  base_url: https://api.example.test/
  api_key: key-1
"#;

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let cfg = parse_config(MINIMAL.to_owned()).await.expect("valid config");

        assert_eq!(cfg.auth.scope, "openid");
        assert!(!cfg.auth.has_secret());
        assert_eq!(cfg.sync.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.proxy.allowed_prefixes, vec!["game/v1/".to_string()]);
        assert_eq!(cfg.proxy.cookie_name, "msf_token");
        assert_eq!(cfg.settings.server.port, "8080");
        assert_eq!(cfg.settings.logging.unwrap().format, LogFormat::Compact);
    }

    #[tokio::test]
    async fn missing_required_values_are_reported_together() {
        let yaml = r#"
auth:
  token_url: ""
upstream:
  base_url: https://api.example.test
"#;
        let err = parse_config(yaml.to_owned()).await.unwrap_err();
        match err.downcast_ref::<AgentError>() {
            Some(AgentError::ConfigMissing(names)) => {
                assert_eq!(
                    names,
                    &vec![
                        "auth.token_url".to_string(),
                        "auth.client_id".to_string(),
                        "upstream.api_key".to_string()
                    ]
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn env_placeholders_expand_with_defaults() {
        std::env::set_var("SYNERGY_TEST_SECRET", "s3cr3t");
        let out = expand_env_vars("a: ${SYNERGY_TEST_SECRET}\nb: ${SYNERGY_TEST_UNSET:fallback}\nc: ${SYNERGY_TEST_UNSET}");
        assert_eq!(out, "a: s3cr3t\nb: fallback\nc: ");
        std::env::remove_var("SYNERGY_TEST_SECRET");
    }
}
