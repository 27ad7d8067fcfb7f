//! Durable storage seams.
//!
//! The pipeline and the HTTP boundary only see [`ObjectStore`] and
//! [`DocumentStore`]; `fs` holds the on-disk implementations used by the binary
//! and `memory` the in-process ones used by tests and embedders.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::AgentResult;

pub mod fs;
pub mod memory;

/// Blob storage addressed by slash-separated relative paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn write(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AgentResult<()>;

    async fn exists(&self, path: &str) -> AgentResult<bool>;

    /// Returns `NotFound` when nothing is stored under `path`.
    async fn read(&self, path: &str) -> AgentResult<Vec<u8>>;
}

/// Document storage with merge-on-write semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Merge `fields` into `collection/doc_id`, creating the document if absent.
    /// Top-level fields present in `fields` replace stored ones; others survive.
    async fn upsert_merge(&self, collection: &str, doc_id: &str, fields: Map<String, Value>) -> AgentResult<()>;

    async fn get(&self, collection: &str, doc_id: &str) -> AgentResult<Option<Map<String, Value>>>;
}

/// Merge `fields` over `existing` at the top level.
pub fn merge_fields(existing: Option<Map<String, Value>>, fields: Map<String, Value>) -> Map<String, Value> {
    let mut merged = existing.unwrap_or_default();
    for (key, value) in fields {
        merged.insert(key, value);
    }
    merged
}
