use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::config::pipeline::{SyncConfig, CHARACTERS_ARTIFACT, METADATA_COLLECTION, METADATA_DOC_ID, TRAITS_ARTIFACT};
use crate::errors::{AgentError, AgentResult};
use crate::helpers::time::{get_instant, now_rfc3339};
use crate::observability::metrics::get_metrics;
use crate::pipeline::datasets::{ArtifactMeta, CharactersArtifact, JSON_CONTENT_TYPE};
use crate::pipeline::normalizer::normalize_all;
use crate::pipeline::paginator::{DatasetPage, Paginator};
use crate::resilience::retry::RetryPolicy;
use crate::sources::oauth2::TokenAcquirer;
use crate::sources::upstream::{FetchJson, UpstreamClient};
use crate::storage::{DocumentStore, ObjectStore};

static ERROR_MSG: &str = "error";
static SUCCESS_MSG: &str = "success";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub traits: usize,
    pub characters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub written: Vec<String>,
    pub counts: SyncCounts,
}

/// Full replace of both datasets: token → traits → characters → metadata.
///
/// Traits are written before characters are fetched. A characters failure leaves
/// the fresh traits artifact in place; each artifact is rebuilt by the next run.
#[derive(Clone)]
pub struct SyncOrchestrator {
    acquirer: TokenAcquirer,
    upstream: UpstreamClient,
    paginator: Paginator<UpstreamClient>,
    objects: Arc<dyn ObjectStore>,
    documents: Arc<dyn DocumentStore>,
    cfg: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(
        acquirer: TokenAcquirer,
        upstream: UpstreamClient,
        retry: RetryPolicy,
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
        cfg: SyncConfig,
    ) -> Self {
        Self {
            paginator: Paginator::new(upstream.clone(), retry),
            acquirer,
            upstream,
            objects,
            documents,
            cfg,
        }
    }

    pub async fn run_sync(&self) -> AgentResult<SyncReport> {
        let metrics = get_metrics().await;
        let start = get_instant();
        info!("sync run start");

        match self.sync_datasets().await {
            Ok(report) => {
                metrics.sync_runs.with_label_values(&[SUCCESS_MSG]).inc();
                metrics.dataset_records.with_label_values(&["traits"]).set(report.counts.traits as i64);
                metrics.dataset_records.with_label_values(&["characters"]).set(report.counts.characters as i64);
                info!(
                    traits = report.counts.traits,
                    characters = report.counts.characters,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "sync run finished"
                );
                Ok(report)
            }
            Err(err) => {
                metrics.sync_runs.with_label_values(&[ERROR_MSG]).inc();
                error!(kind = err.kind(), "sync run failed: {}", err);
                Err(err)
            }
        }
    }

    async fn sync_datasets(&self) -> AgentResult<SyncReport> {
        let token = self.acquirer.acquire_or_refresh().await?;
        let bearer = token.access_token.as_str();

        // traits: one request, persisted verbatim
        let traits = self.upstream.fetch_json(&self.cfg.traits_path, bearer).await?;
        let traits_count = DatasetPage::from_body(traits.clone()).items.len();
        self.objects
            .write(TRAITS_ARTIFACT, to_json_bytes(&traits)?, JSON_CONTENT_TYPE)
            .await?;
        info!("traits dataset written: {} records", traits_count);

        // characters: paged, normalized
        let raw = self
            .paginator
            .collect_all(&self.cfg.characters_path, self.cfg.page_size, bearer)
            .await?;
        let characters = normalize_all(&raw);
        let artifact = CharactersArtifact {
            items: &characters,
            meta: ArtifactMeta {
                per_total: characters.len(),
                per_page: self.cfg.page_size,
                page: 1,
            },
        };
        self.objects
            .write(CHARACTERS_ARTIFACT, to_json_bytes(&artifact)?, JSON_CONTENT_TYPE)
            .await?;
        info!("characters dataset written: {} records", characters.len());

        let counts = SyncCounts { traits: traits_count, characters: characters.len() };
        self.documents
            .upsert_merge(METADATA_COLLECTION, METADATA_DOC_ID, metadata_fields(&counts))
            .await?;

        Ok(SyncReport {
            written: vec![TRAITS_ARTIFACT.to_string(), CHARACTERS_ARTIFACT.to_string()],
            counts,
        })
    }
}

fn metadata_fields(counts: &SyncCounts) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("updatedAt".to_string(), Value::String(now_rfc3339()));
    fields.insert(
        "counts".to_string(),
        json!({"traits": counts.traits, "characters": counts.characters}),
    );
    fields
}

fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> AgentResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| AgentError::Persistence(e.to_string()))
}
