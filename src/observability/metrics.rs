use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_exchanges: IntCounterVec,
    pub token_exchange_duration: HistogramVec,
    pub token_cache_hits: IntCounter,
    pub token_expiry_unix: IntGauge,

    // Upstream metrics
    pub upstream_requests: IntCounterVec,
    pub upstream_duration: HistogramVec,

    // Pipeline metrics
    pub pages_fetched: IntCounterVec,
    pub sync_runs: IntCounterVec,
    pub dataset_records: IntGaugeVec,

    // Proxy metrics
    pub proxy_requests: IntCounterVec,

    // Config/runtime
    pub config_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("synergyagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_exchanges: IntCounterVec::new(Opts::new("token_exchanges_total", "Client-credentials exchanges by result"), &["result"]).unwrap(),
            token_exchange_duration: HistogramVec::new(HistogramOpts::new("token_exchange_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["result"]).unwrap(),
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Token requests served from cache").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Cached token expiry timestamp").unwrap(),

            // Upstream
            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total", "Upstream requests by status class"), &["status"]).unwrap(),
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_request_duration_seconds", "Upstream request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["kind"]).unwrap(),

            // Pipeline
            pages_fetched: IntCounterVec::new(Opts::new("pages_fetched_total", "Pages fetched by the paginator"), &["resource"]).unwrap(),
            sync_runs: IntCounterVec::new(Opts::new("sync_runs_total", "Sync runs by result"), &["result"]).unwrap(),
            dataset_records: IntGaugeVec::new(Opts::new("dataset_records", "Records written by the last sync"), &["dataset"]).unwrap(),

            // Proxy
            proxy_requests: IntCounterVec::new(Opts::new("proxy_requests_total", "Proxy requests by outcome"), &["outcome"]).unwrap(),

            // Config/runtime
            config_errors: IntCounter::new("config_errors_total", "Config parse and validation errors").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_exchanges.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchange_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.pages_fetched.clone())).unwrap();
        reg.register(Box::new(metrics.sync_runs.clone())).unwrap();
        reg.register(Box::new(metrics.dataset_records.clone())).unwrap();
        reg.register(Box::new(metrics.proxy_requests.clone())).unwrap();
        reg.register(Box::new(metrics.config_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}

/// Status class label (`2xx`, `4xx`, ...) for an HTTP status code.
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
