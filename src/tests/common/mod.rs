// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use reqwest::Client;
use serde_json::Value;

use crate::config::pipeline::{ProxyConfig, StorageConfig, SyncConfig};
use crate::config::settings::{MetricsConfig, SettingsConfig};
use crate::config::sources::{AuthConfig, ServiceConfig, UpstreamConfig};
use crate::errors::{AgentError, AgentResult};
use crate::sources::upstream::FetchJson;

pub const API_KEY: &str = "sub-key";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Service config pointing both the token endpoint and the game API at `addr`.
pub fn test_config(addr: SocketAddr, client_secret: &str) -> ServiceConfig {
    ServiceConfig {
        settings: SettingsConfig {
            metrics: MetricsConfig { path: "/metrics".into(), is_enabled: true },
            ..SettingsConfig::default()
        },
        auth: AuthConfig {
            token_url: format!("http://{}/oauth2/token", addr),
            client_id: "app".into(),
            client_secret: client_secret.into(),
            scope: "openid".into(),
        },
        upstream: UpstreamConfig {
            base_url: format!("http://{}/", addr),
            api_key: API_KEY.into(),
            user_agent: "synergy-agent/test".into(),
        },
        proxy: ProxyConfig::default(),
        sync: SyncConfig::default(),
        storage: StorageConfig::default(),
    }
}

// -------------------------------
// Mock authorization server + game API
// -------------------------------

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub token_status: u16,
    pub token_body: String,
    /// bearer the game API accepts
    pub valid_bearer: String,
    pub traits_body: Value,
    pub character_count: usize,
    pub characters_status: u16,
    pub declare_total: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            token_status: 200,
            token_body: json!({"access_token": "abc", "expires_in": 1800}).to_string(),
            valid_bearer: "abc".into(),
            traits_body: json!([{"id": "t1", "name": "Fast"}]),
            character_count: 5,
            characters_status: 200,
            declare_total: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedTokenRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockCounters {
    pub token_calls: Arc<AtomicUsize>,
    pub traits_calls: Arc<AtomicUsize>,
    pub characters_calls: Arc<AtomicUsize>,
    pub admin_calls: Arc<AtomicUsize>,
    pub token_requests: Arc<Mutex<Vec<CapturedTokenRequest>>>,
    pub character_queries: Arc<Mutex<Vec<String>>>,
}

impl MockCounters {
    pub fn token(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
    pub fn traits(&self) -> usize {
        self.traits_calls.load(Ordering::SeqCst)
    }
    pub fn characters(&self) -> usize {
        self.characters_calls.load(Ordering::SeqCst)
    }
    pub fn admin(&self) -> usize {
        self.admin_calls.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MockApi {
    opts: Arc<MockOptions>,
    counters: MockCounters,
}

pub async fn spawn_mock_api(opts: MockOptions) -> (JoinHandle<()>, SocketAddr, MockCounters) {
    let counters = MockCounters::default();
    let state = MockApi { opts: Arc::new(opts), counters: counters.clone() };
    let router = Router::new()
        .route("/oauth2/token", post(token_handler))
        .route("/game/v1/traits", get(traits_handler))
        .route("/game/v1/characters", get(characters_handler))
        .route("/game/v1/teapot", get(teapot_handler))
        .route("/admin/v1/delete", get(admin_handler))
        .with_state(state);
    let (handle, addr) = spawn_axum(router).await;
    (handle, addr, counters)
}

async fn token_handler(State(mock): State<MockApi>, headers: HeaderMap, body: String) -> Response {
    mock.counters.token_calls.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    mock.counters.token_requests.lock().unwrap().push(CapturedTokenRequest {
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    });
    (StatusCode::from_u16(mock.opts.token_status).unwrap(), mock.opts.token_body.clone()).into_response()
}

fn authorized(mock: &MockApi, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", mock.opts.valid_bearer);
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(expected.as_str())
        && headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [("content-type", "application/json")],
        "{\"error\":\"invalid token\"}",
    )
        .into_response()
}

async fn traits_handler(State(mock): State<MockApi>, headers: HeaderMap) -> Response {
    mock.counters.traits_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    axum::Json(mock.opts.traits_body.clone()).into_response()
}

async fn characters_handler(State(mock): State<MockApi>, RawQuery(query): RawQuery, headers: HeaderMap) -> Response {
    mock.counters.characters_calls.fetch_add(1, Ordering::SeqCst);
    let query = query.unwrap_or_default();
    mock.counters.character_queries.lock().unwrap().push(query.clone());
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    if mock.opts.characters_status != 200 {
        return (StatusCode::from_u16(mock.opts.characters_status).unwrap(), "upstream exploded").into_response();
    }

    let page = query_param(&query, "page").unwrap_or(1).max(1);
    let per_page = query_param(&query, "perPage").unwrap_or(100).max(1);
    let total = mock.opts.character_count;
    let start = ((page - 1) * per_page).min(total);
    let end = (page * per_page).min(total);
    let items: Vec<Value> = (start..end)
        .map(|i| json!({"id": i, "name": format!("Hero {}", i), "traits": ["Hero", i], "bio": "dropped", "stats": {"power": i}}))
        .collect();

    let mut body = json!({"items": items});
    if mock.opts.declare_total {
        body["meta"] = json!({"perTotal": total, "perPage": per_page, "page": page});
    }
    axum::Json(body).into_response()
}

async fn teapot_handler(State(mock): State<MockApi>, headers: HeaderMap) -> Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    (
        StatusCode::IM_A_TEAPOT,
        [("content-type", "application/vnd.msf+json; charset=utf-8")],
        "{\"odd\" :  [1,2 ]}",
    )
        .into_response()
}

async fn admin_handler(State(mock): State<MockApi>) -> Response {
    mock.counters.admin_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, "deleted").into_response()
}

pub fn query_param(query: &str, key: &str) -> Option<usize> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.parse().ok())
}

// -------------------------------
// Scripted pages for paginator tests
// -------------------------------

/// In-process page source: serves `page_sizes[page - 1]` items (or `full_pages`
/// items on every page) and records every requested path.
#[derive(Debug, Default)]
pub struct ScriptedPages {
    pub page_sizes: Vec<usize>,
    pub full_pages: Option<usize>,
    pub per_total: Option<u64>,
    /// pages that fail once before succeeding
    pub flaky_pages: Mutex<HashSet<usize>>,
    pub requested: Mutex<Vec<String>>,
}

impl ScriptedPages {
    pub fn sizes(page_sizes: Vec<usize>) -> Self {
        Self { page_sizes, ..Self::default() }
    }

    pub fn always_full(page_size: usize) -> Self {
        Self { full_pages: Some(page_size), ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    fn page_of(path: &str) -> usize {
        path.split_once('?')
            .and_then(|(_, q)| query_param(q, "page"))
            .unwrap_or(1)
    }
}

impl FetchJson for ScriptedPages {
    async fn fetch_json(&self, relative_path: &str, _bearer_token: &str) -> AgentResult<Value> {
        self.requested.lock().unwrap().push(relative_path.to_owned());
        let page = Self::page_of(relative_path);

        if self.flaky_pages.lock().unwrap().remove(&page) {
            return Err(AgentError::UpstreamHttp {
                status: 503,
                status_text: "Service Unavailable".into(),
                body_prefix: String::new(),
            });
        }

        let (size, offset) = match self.full_pages {
            Some(full) => (full, (page - 1) * full),
            None => {
                let earlier = &self.page_sizes[..(page - 1).min(self.page_sizes.len())];
                (self.page_sizes.get(page - 1).copied().unwrap_or(0), earlier.iter().sum())
            }
        };
        let items: Vec<Value> = (0..size).map(|i| json!({"id": offset + i})).collect();

        let mut body = json!({"items": items});
        if let Some(total) = self.per_total {
            body["meta"] = json!({"perTotal": total});
        }
        Ok(body)
    }
}
