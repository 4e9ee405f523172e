//! Git repository access.

pub mod client;

pub use client::GitClient;
