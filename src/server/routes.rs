use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::header::{CONTENT_TYPE, SET_COOKIE};
use serde_json::json;
use tracing::{error, info, warn};

use crate::errors::AgentError;
use crate::pipeline::datasets::JSON_CONTENT_TYPE;
use crate::server::proxy::ProxyResponse;
use crate::server::server::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/token", post(mint_token))
        .route("/api/me", get(identity))
        .route("/api/proxy/{*path}", get(proxy))
        .route("/api/sync", post(sync))
        .route("/api/datasets/{name}", get(dataset))
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match &self {
            AgentError::Unauthorized => StatusCode::UNAUTHORIZED,
            AgentError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::NotFound(_) => StatusCode::NOT_FOUND,
            AgentError::TokenTransport { .. }
            | AgentError::TokenParse(_)
            | AgentError::TokenShape(_)
            | AgentError::UpstreamHttp { .. }
            | AgentError::UpstreamTransport(_) => StatusCode::BAD_GATEWAY,
            AgentError::ConfigMissing(_) | AgentError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string(), "kind": self.kind()}))).into_response()
    }
}

async fn mint_token(State(state): State<AppState>) -> Response {
    match state.mint_token().await {
        Ok(token) => {
            let cookie = state.session.issue(&token.access_token, token.expires_in);
            with_cookie(Json(json!({"expires_in": token.expires_in})).into_response(), &cookie)
        }
        Err(err) => {
            error!("token mint failed: {}", err);
            err.into_response()
        }
    }
}

async fn identity(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = state.session.read(&headers);
    Json(state.identity(token.as_deref())).into_response()
}

/// Relay one upstream GET. An upstream 401 triggers one token refresh and one
/// retry; the refreshed token is handed back in the session cookie.
async fn proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let target = match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path,
    };
    let caller_token = state.session.read(&headers);

    let first = match state.proxy(&target, caller_token.as_deref()).await {
        Ok(response) => response,
        Err(err) => return err.into_response(),
    };
    if first.status != StatusCode::UNAUTHORIZED.as_u16() {
        return relay(first);
    }

    warn!("upstream rejected caller token for {}, refreshing once", target);
    let fresh = match state.acquirer.refresh().await {
        Ok(fresh) => fresh,
        Err(err) => {
            error!("token refresh after upstream 401 failed: {}", err);
            return relay(first);
        }
    };
    match state.proxy(&target, Some(&fresh.access_token)).await {
        Ok(second) => {
            info!(status = second.status, "retried {} with refreshed token", target);
            let cookie = state.session.issue(&fresh.access_token, fresh.expires_in);
            with_cookie(relay(second), &cookie)
        }
        Err(err) => err.into_response(),
    }
}

async fn sync(State(state): State<AppState>) -> Response {
    match state.sync().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string(), "kind": err.kind()})),
        )
            .into_response(),
    }
}

async fn dataset(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.get_dataset(&name).await {
        Ok(bytes) => ([(CONTENT_TYPE, JSON_CONTENT_TYPE)], bytes).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Upstream status, content type and body, untouched.
fn relay(upstream: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = status;
    if let Some(content_type) = upstream.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => error!("session cookie not representable as header: {}", err),
    }
    response
}
