use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::cache::token::IssuedToken;
use crate::cache::token_cache::TokenCache;
use crate::config::settings::SettingsConfig;
use crate::config::sources::ServiceConfig;
use crate::errors::AgentResult;
use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;
use crate::pipeline::datasets;
use crate::pipeline::orchestrator::{SyncOrchestrator, SyncReport};
use crate::server::proxy::{ProxyResponse, RequestProxy};
use crate::server::routes;
use crate::server::session::SessionCookie;
use crate::sources::oauth2::TokenAcquirer;
use crate::sources::upstream::UpstreamClient;
use crate::storage::fs::{FsObjectStore, JsonFileDocumentStore};
use crate::storage::{DocumentStore, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    #[serde(rename = "hasToken")]
    pub has_token: bool,
}

/// Everything a request handler needs. Cheap to clone; all parts are shared.
#[derive(Clone)]
pub struct AppState {
    pub acquirer: TokenAcquirer,
    pub proxy: RequestProxy,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub objects: Arc<dyn ObjectStore>,
    pub session: SessionCookie,
    pub metrics_state: MetricsState,
}

impl AppState {
    pub async fn new(
        cfg: &ServiceConfig,
        client: Client,
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let metrics = get_metrics().await;
        let acquirer = TokenAcquirer::new(client.clone(), cfg.auth.clone(), TokenCache::new());
        let upstream = UpstreamClient::new(client, cfg.upstream.clone());
        let orchestrator = SyncOrchestrator::new(
            acquirer.clone(),
            upstream.clone(),
            cfg.settings.retry_policy(),
            objects.clone(),
            documents,
            cfg.sync.clone(),
        );

        Self {
            proxy: RequestProxy::new(upstream, cfg.proxy.allowed_prefixes.clone()),
            acquirer,
            orchestrator: Arc::new(orchestrator),
            objects,
            session: SessionCookie::from_config(&cfg.proxy),
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }

    /// State backed by the on-disk stores named in `cfg.storage`.
    pub async fn from_config(cfg: &ServiceConfig, client: Client) -> Self {
        let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&cfg.storage.objects_root));
        let documents: Arc<dyn DocumentStore> = Arc::new(JsonFileDocumentStore::new(&cfg.storage.documents_root));
        Self::new(cfg, client, objects, documents).await
    }

    /// Application token for the boundary to store in the session cookie.
    pub async fn mint_token(&self) -> AgentResult<IssuedToken> {
        self.acquirer.acquire_or_refresh().await
    }

    pub async fn proxy(&self, path: &str, caller_token: Option<&str>) -> AgentResult<ProxyResponse> {
        self.proxy.proxy(path, caller_token).await
    }

    pub async fn sync(&self) -> AgentResult<SyncReport> {
        self.orchestrator.run_sync().await
    }

    pub fn identity(&self, caller_token: Option<&str>) -> Identity {
        Identity { has_token: caller_token.is_some_and(|t| !t.is_empty()) }
    }

    pub async fn get_dataset(&self, name: &str) -> AgentResult<Vec<u8>> {
        datasets::get_dataset(self.objects.as_ref(), name).await
    }
}

pub fn router(state: AppState, settings: &SettingsConfig) -> Router {
    Router::new()
        .merge(routes::api_router())
        .merge(state.metrics_state.router(&settings.metrics))
        .with_state(state)
}

/// Bind `settings.server` and serve until the process exits.
pub async fn start(settings: &SettingsConfig, state: AppState) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(state, settings);

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);
    metrics.up.set(1);
    axum::serve(listener, app).await.context("http server failed")?;
    Ok(())
}
