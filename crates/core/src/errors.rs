//! Error types for the forksync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type. The annotator and the reconciliation engine are total over
//! well-formed input and define no errors of their own.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A revspec (remote/branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// A remote already exists under the same name with a different URL.
    #[error("remote '{remote}' points at '{existing}', expected '{requested}'")]
    RemoteUrlMismatch {
        remote: String,
        existing: String,
        requested: String,
    },

    /// The two revisions share no common ancestor.
    #[error("no merge base between '{a}' and '{b}'")]
    NoMergeBase {
        a: String,
        b: String,
    },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Metrics errors
// ---------------------------------------------------------------------------

/// Errors from the metrics push subsystem.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("influxdb HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The write API returned a non-success status code.
    #[error("influxdb API error (HTTP {status}): {body}")]
    ApiError {
        status: u16,
        body: String,
    },

    /// No API token is configured for a non-dry-run push.
    #[error("influxdb token is not configured (set the variable named by influx.token_env)")]
    MissingToken,
}
