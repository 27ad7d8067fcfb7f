//! # Synergy Agent Library
//!
//! Server-side companion for a game API: acquires an application token with the
//! client-credentials grant, relays allow-listed reads on behalf of callers, and
//! snapshots the traits and characters datasets into durable storage.
//!
//! Modules:
//! - `config`: YAML service configuration, env expansion and validation
//! - `cache`: application token cache
//! - `sources`: OAuth2 token acquisition and the upstream game API client
//! - `pipeline`: pagination, normalization and the dataset sync
//! - `storage`: object and document stores (filesystem and in-memory)
//! - `server`: HTTP routes, session cookie and the allow-listed proxy

pub mod config;
pub mod cache;
pub mod sources;
pub mod pipeline;
pub mod storage;
pub mod resilience;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;
pub mod errors;

#[cfg(test)]
mod tests;

pub use crate::config::sources::ServiceConfig;
pub use crate::errors::{AgentError, AgentResult};
