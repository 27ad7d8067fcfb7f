pub mod datasets;
pub mod normalizer;
pub mod orchestrator;
pub mod paginator;
pub mod scheduler;
