use serde::Deserialize;

use crate::config::pipeline::{ProxyConfig, StorageConfig, SyncConfig};
use crate::config::settings::SettingsConfig;

pub const DEFAULT_SCOPE: &str = "openid";
pub const DEFAULT_USER_AGENT: &str = "synergy-agent/0.1";

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// ================================
/// Authorization server (client credentials)
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub client_id: String,
    /// empty secret → credentials travel as form fields instead of Basic auth
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl AuthConfig {
    pub fn has_secret(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// ================================
/// Game-data API
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub base_url: String,
    /// subscription key sent as `x-api-key`
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
