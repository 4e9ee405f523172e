//! forksync core library.
//!
//! This crate provides the foundational components for tracking the
//! synchronization status of a git fork against its upstream: commit
//! annotation, two-pass history reconciliation, the history walker,
//! configuration, and metrics derivation and push.

pub mod annotate;
pub mod config;
pub mod errors;
pub mod git;
pub mod influx;
pub mod metrics;
pub mod models;
pub mod reconcile;

// Re-exports for convenience.
pub use annotate::annotate;
pub use config::AppConfig;
pub use git::GitClient;
pub use influx::InfluxClient;
pub use models::{CommitMeta, CommitRecord, SyncData, SyncMeta};
pub use reconcile::reconcile;
