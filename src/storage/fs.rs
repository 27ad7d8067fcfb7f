use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, error, info};

use crate::errors::{AgentError, AgentResult};
use crate::storage::{merge_fields, DocumentStore, ObjectStore};

/// Objects as files under `root`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> AgentResult<PathBuf> {
        resolve_under(&self.root, path)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn write(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AgentResult<()> {
        let target = self.resolve(path)?;
        write_atomic(&target, &bytes).await.inspect_err(|err| {
            error!("object write to {} failed: {}", target.display(), err);
        })?;
        info!(content_type, size = bytes.len(), "object written to {}", target.display());
        Ok(())
    }

    async fn exists(&self, path: &str) -> AgentResult<bool> {
        let target = self.resolve(path)?;
        Ok(fs::try_exists(&target).await?)
    }

    async fn read(&self, path: &str) -> AgentResult<Vec<u8>> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AgentError::NotFound(path.to_owned())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Documents as `root/<collection>/<doc_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileDocumentStore {
    root: PathBuf,
}

impl JsonFileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn doc_path(&self, collection: &str, doc_id: &str) -> AgentResult<PathBuf> {
        resolve_under(&self.root, &format!("{}/{}.json", collection, doc_id))
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn upsert_merge(&self, collection: &str, doc_id: &str, fields: Map<String, Value>) -> AgentResult<()> {
        let path = self.doc_path(collection, doc_id)?;
        let existing = self.get(collection, doc_id).await?;
        let merged = merge_fields(existing, fields);
        let bytes = serde_json::to_vec_pretty(&Value::Object(merged))
            .map_err(|e| AgentError::Persistence(e.to_string()))?;
        write_atomic(&path, &bytes).await?;
        debug!("document {}/{} upserted", collection, doc_id);
        Ok(())
    }

    async fn get(&self, collection: &str, doc_id: &str) -> AgentResult<Option<Map<String, Value>>> {
        let path = self.doc_path(collection, doc_id)?;
        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(_) => Err(AgentError::Persistence(format!("document {} is not an object", path.display()))),
                Err(e) => Err(AgentError::Persistence(e.to_string())),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Join a relative storage path onto `root`, refusing anything that escapes it.
fn resolve_under(root: &Path, path: &str) -> AgentResult<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.trim().is_empty() || escapes {
        return Err(AgentError::BadRequest(format!("invalid storage path '{}'", path)));
    }
    Ok(root.join(relative))
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling temp path unique per write, so concurrent writers never share one.
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target.file_name().and_then(|n| n.to_str()).unwrap_or("object");
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
}

/// tmp file → 0600 → rename, so readers never observe a partial artifact.
async fn write_atomic(target: &Path, bytes: &[u8]) -> AgentResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path_for(target);
    let result = persist(&tmp, target, bytes).await;
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

async fn persist(tmp: &Path, target: &Path, bytes: &[u8]) -> AgentResult<()> {
    fs::write(tmp, bytes).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }
    fs::rename(tmp, target).await?;
    Ok(())
}
