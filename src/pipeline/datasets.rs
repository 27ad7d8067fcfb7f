use std::str::FromStr;

use serde::Serialize;

use crate::config::pipeline::{CHARACTERS_ARTIFACT, TRAITS_ARTIFACT};
use crate::errors::{AgentError, AgentResult};
use crate::pipeline::normalizer::NormalizedCharacter;
use crate::storage::ObjectStore;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetName {
    Traits,
    Characters,
}

impl DatasetName {
    pub fn artifact_path(&self) -> &'static str {
        match self {
            DatasetName::Traits => TRAITS_ARTIFACT,
            DatasetName::Characters => CHARACTERS_ARTIFACT,
        }
    }
}

impl FromStr for DatasetName {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches(".json") {
            "traits" => Ok(DatasetName::Traits),
            "characters" => Ok(DatasetName::Characters),
            other => Err(AgentError::NotFound(format!("unknown dataset '{}'", other))),
        }
    }
}

/// Bytes of a persisted dataset; `NotFound` for unknown names or absent artifacts.
pub async fn get_dataset(objects: &dyn ObjectStore, name: &str) -> AgentResult<Vec<u8>> {
    let dataset: DatasetName = name.parse()?;
    objects.read(dataset.artifact_path()).await
}

/// Persisted shape of the characters dataset.
#[derive(Debug, Serialize)]
pub struct CharactersArtifact<'a> {
    pub items: &'a [NormalizedCharacter],
    pub meta: ArtifactMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    pub per_total: usize,
    pub per_page: usize,
    pub page: u32,
}
