//! Error taxonomy shared by the token, upstream, pipeline and proxy layers.

use thiserror::Error;

/// Response bodies written into errors and logs are cut to this many characters.
pub const BODY_PREFIX_CHARS: usize = 200;

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Required configuration values are absent. Carries every missing name.
    #[error("missing configuration: {}", .0.join(", "))]
    ConfigMissing(Vec<String>),

    #[error("token endpoint transport failure (status {status:?}): {message}")]
    TokenTransport { status: Option<u16>, message: String },

    #[error("token endpoint returned non-JSON body: {0}")]
    TokenParse(String),

    #[error("token response is missing a usable field: {0}")]
    TokenShape(String),

    #[error("upstream responded {status} {status_text}")]
    UpstreamHttp {
        status: u16,
        status_text: String,
        body_prefix: String,
    },

    #[error("upstream request failed: {0}")]
    UpstreamTransport(String),

    #[error("caller token is absent")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl AgentError {
    /// Stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::ConfigMissing(_) => "config_missing",
            AgentError::TokenTransport { .. } => "token_transport",
            AgentError::TokenParse(_) => "token_parse",
            AgentError::TokenShape(_) => "token_shape",
            AgentError::UpstreamHttp { .. } => "upstream_http",
            AgentError::UpstreamTransport(_) => "upstream_transport",
            AgentError::Unauthorized => "unauthorized",
            AgentError::BadRequest(_) => "bad_request",
            AgentError::NotFound(_) => "not_found",
            AgentError::Persistence(_) => "persistence",
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Persistence(err.to_string())
    }
}

/// Cut `body` to at most [`BODY_PREFIX_CHARS`] characters on a char boundary.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(BODY_PREFIX_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}
