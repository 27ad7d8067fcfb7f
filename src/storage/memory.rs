use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::errors::{AgentError, AgentResult};
use crate::storage::{merge_fields, DocumentStore, ObjectStore};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<RwLock<HashMap<String, StoredObject>>>,
    writes: Arc<RwLock<Vec<String>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, path: &str) -> Option<StoredObject> {
        self.inner.read().await.get(path).cloned()
    }

    /// Paths in write order, repeats included.
    pub async fn write_log(&self) -> Vec<String> {
        self.writes.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn write(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AgentResult<()> {
        self.inner.write().await.insert(
            path.to_owned(),
            StoredObject { bytes, content_type: content_type.to_owned() },
        );
        self.writes.write().await.push(path.to_owned());
        Ok(())
    }

    async fn exists(&self, path: &str) -> AgentResult<bool> {
        Ok(self.inner.read().await.contains_key(path))
    }

    async fn read(&self, path: &str) -> AgentResult<Vec<u8>> {
        self.inner
            .read()
            .await
            .get(path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| AgentError::NotFound(path.to_owned()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<HashMap<(String, String), Map<String, Value>>>>,
    upserts: Arc<RwLock<usize>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_count(&self) -> usize {
        *self.upserts.read().await
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert_merge(&self, collection: &str, doc_id: &str, fields: Map<String, Value>) -> AgentResult<()> {
        let key = (collection.to_owned(), doc_id.to_owned());
        let mut guard = self.inner.write().await;
        let merged = merge_fields(guard.remove(&key), fields);
        guard.insert(key, merged);
        *self.upserts.write().await += 1;
        Ok(())
    }

    async fn get(&self, collection: &str, doc_id: &str) -> AgentResult<Option<Map<String, Value>>> {
        Ok(self
            .inner
            .read()
            .await
            .get(&(collection.to_owned(), doc_id.to_owned()))
            .cloned())
    }
}
