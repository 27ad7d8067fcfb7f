use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: usize = 200;
pub const DEFAULT_TRAITS_PATH: &str = "game/v1/traits?lang=none";
pub const DEFAULT_CHARACTERS_PATH: &str =
    "game/v1/characters?lang=none&traitFormat=id&page={page}&perPage={perPage}";
pub const TRAITS_ARTIFACT: &str = "datasets/traits.json";
pub const CHARACTERS_ARTIFACT: &str = "datasets/characters.json";
pub const METADATA_COLLECTION: &str = "meta";
pub const METADATA_DOC_ID: &str = "datasets";

/// ================================
/// Request proxy
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    #[serde(default = "default_allowed_prefixes")]
    pub allowed_prefixes: Vec<String>,
    /// cookie carrying the caller token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_prefixes: default_allowed_prefixes(),
            cookie_name: default_cookie_name(),
            secure_cookie: false,
        }
    }
}

/// ================================
/// Dataset sync
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_traits_path")]
    pub traits_path: String,
    /// `{page}` and `{perPage}` are substituted per request
    #[serde(default = "default_characters_path")]
    pub characters_path: String,
    /// run sync in the background every N seconds while serving
    pub interval_seconds: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            traits_path: default_traits_path(),
            characters_path: default_characters_path(),
            interval_seconds: None,
        }
    }
}

/// ================================
/// Durable storage
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// root directory for dataset artifacts
    #[serde(default = "default_objects_root")]
    pub objects_root: String,
    /// root directory for metadata documents
    #[serde(default = "default_documents_root")]
    pub documents_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            objects_root: default_objects_root(),
            documents_root: default_documents_root(),
        }
    }
}

fn default_allowed_prefixes() -> Vec<String> {
    vec!["game/v1/".to_string()]
}

fn default_cookie_name() -> String {
    "msf_token".to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_traits_path() -> String {
    DEFAULT_TRAITS_PATH.to_string()
}

fn default_characters_path() -> String {
    DEFAULT_CHARACTERS_PATH.to_string()
}

fn default_objects_root() -> String {
    "./data/objects".to_string()
}

fn default_documents_root() -> String {
    "./data/documents".to_string()
}
