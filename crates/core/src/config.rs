//! TOML-based configuration for forksync.
//!
//! Every section has working defaults (the public Zephyr fork pair), so an
//! empty config file is valid. The InfluxDB token is referenced through a
//! `token_env` field naming an environment variable; the secret itself is
//! resolved at runtime via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream repository settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Downstream (fork) repository settings.
    #[serde(default)]
    pub downstream: DownstreamConfig,

    /// Local clone settings.
    #[serde(default)]
    pub clone: CloneConfig,

    /// InfluxDB metrics push settings.
    #[serde(default)]
    pub influx: InfluxConfig,
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Upstream repository: the history being tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Repository URL.
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Revision (branch, tag, or sha) marking the upstream tip.
    #[serde(default = "default_rev")]
    pub rev: String,

    /// Local remote name for the upstream repository.
    #[serde(default = "default_upstream_remote")]
    pub remote: String,
}

fn default_upstream_url() -> String {
    "https://github.com/zephyrproject-rtos/zephyr".into()
}
fn default_rev() -> String {
    "main".into()
}
fn default_upstream_remote() -> String {
    "origin".into()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            rev: default_rev(),
            remote: default_upstream_remote(),
        }
    }
}

/// Downstream repository: the fork incorporating upstream changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamConfig {
    /// Repository URL.
    #[serde(default = "default_downstream_url")]
    pub url: String,

    /// Revision (branch, tag, or sha) marking the downstream tip.
    #[serde(default = "default_rev")]
    pub rev: String,

    /// Local remote name for the downstream repository.
    #[serde(default = "default_downstream_remote")]
    pub remote: String,
}

fn default_downstream_url() -> String {
    "https://github.com/nrfconnect/sdk-zephyr".into()
}
fn default_downstream_remote() -> String {
    "downstream".into()
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: default_downstream_url(),
            rev: default_rev(),
            remote: default_downstream_remote(),
        }
    }
}

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

/// Local clone settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneConfig {
    /// Directory holding the local clone with both remotes.
    #[serde(default = "default_clone_dir")]
    pub dir: PathBuf,

    /// Refetch both remotes before collecting.
    #[serde(default)]
    pub refetch: bool,
}

fn default_clone_dir() -> PathBuf {
    PathBuf::from("repo")
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            dir: default_clone_dir(),
            refetch: false,
        }
    }
}

// ---------------------------------------------------------------------------
// InfluxDB
// ---------------------------------------------------------------------------

/// InfluxDB write API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// InfluxDB base URL.
    #[serde(default = "default_influx_url")]
    pub url: String,

    /// Organization name.
    #[serde(default = "default_influx_org")]
    pub org: String,

    /// Target bucket.
    #[serde(default = "default_influx_bucket")]
    pub bucket: String,

    /// Measurement name for derived entries.
    #[serde(default = "default_influx_measurement")]
    pub measurement: String,

    /// Environment variable holding the API token.
    #[serde(default = "default_influx_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_influx_url() -> String {
    "https://ci-health-influxdb.nordicsemi.no".into()
}
fn default_influx_org() -> String {
    "my-org".into()
}
fn default_influx_bucket() -> String {
    "ruge".into()
}
fn default_influx_measurement() -> String {
    "zephyr".into()
}
fn default_influx_token_env() -> String {
    "INFLUXDB_TOKEN".into()
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            org: default_influx_org(),
            bucket: default_influx_bucket(),
            measurement: default_influx_measurement(),
            token_env: default_influx_token_env(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the InfluxDB token from the environment variable named by
    /// `influx.token_env`. A missing variable logs a warning rather than
    /// failing -- collection runs never need the token.
    pub fn resolve_env_vars(&mut self) {
        self.influx.token = resolve_optional_env(&self.influx.token_env, "influx.token_env");
    }

    /// Validate that all fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("upstream.url", &self.upstream.url),
            ("upstream.rev", &self.upstream.rev),
            ("upstream.remote", &self.upstream.remote),
            ("downstream.url", &self.downstream.url),
            ("downstream.rev", &self.downstream.rev),
            ("downstream.remote", &self.downstream.remote),
            ("influx.url", &self.influx.url),
            ("influx.org", &self.influx.org),
            ("influx.bucket", &self.influx.bucket),
            ("influx.measurement", &self.influx.measurement),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
        }

        if self.upstream.remote == self.downstream.remote {
            return Err(ConfigError::InvalidValue {
                field: "downstream.remote".into(),
                detail: format!(
                    "must differ from upstream.remote ('{}')",
                    self.upstream.remote
                ),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// The default configuration rendered as a commented TOML template,
    /// used by `forksync init`.
    pub fn default_toml() -> String {
        r#"# forksync configuration

[upstream]
url = "https://github.com/zephyrproject-rtos/zephyr"
rev = "main"
remote = "origin"

[downstream]
url = "https://github.com/nrfconnect/sdk-zephyr"
rev = "main"
remote = "downstream"

[clone]
dir = "repo"
refetch = false

[influx]
url = "https://ci-health-influxdb.nordicsemi.no"
org = "my-org"
bucket = "ruge"
measurement = "zephyr"
token_env = "INFLUXDB_TOKEN"
"#
        .to_string()
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
