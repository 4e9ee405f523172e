//! forksync command-line tool.
//!
//! Provides subcommands for collecting fork synchronization data as JSON,
//! deriving and pushing aggregate metrics to InfluxDB, and generating /
//! validating configuration files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

use forksync_core::annotate;
use forksync_core::config::AppConfig;
use forksync_core::errors::MetricsError;
use forksync_core::git::GitClient;
use forksync_core::influx::InfluxClient;
use forksync_core::metrics::{derive_entry, MetricsEntry};
use forksync_core::models::{SyncData, SyncMeta};
use forksync_core::reconcile::reconcile;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// forksync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "forksync",
    version,
    about = "Track synchronization status between a git fork and its upstream"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        global = true,
        default_value = "~/.config/forksync/config.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect fork synchronization data and write it as JSON.
    Collect {
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Refetch both remotes before collecting.
        #[arg(long)]
        refetch: bool,
    },

    /// Derive aggregate metrics from collected data and push them to InfluxDB.
    PushMetrics {
        /// Collected sync data JSON file.
        #[arg(short, long)]
        input: PathBuf,

        /// Print the derived entry instead of pushing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./forksync.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = expand_tilde(&cli.config);

    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&config_path),
        Commands::Collect { output, refetch } => {
            cmd_collect(&config_path, output.as_deref(), refetch).await
        }
        Commands::PushMetrics { input, dry_run } => {
            cmd_push_metrics(&config_path, &input, dry_run).await
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Load the config file, falling back to built-in defaults when the file
/// does not exist (every setting has a working default).
fn load_config(path: &str) -> Result<AppConfig> {
    let mut config = if Path::new(path).exists() {
        AppConfig::load_from_file(path).context("failed to load configuration file")?
    } else {
        info!(path, "no config file found, using built-in defaults");
        AppConfig::default()
    };
    config.resolve_env_vars();
    config.validate().context("configuration validation failed")?;
    Ok(config)
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_collect(config_path: &str, output: Option<&Path>, refetch: bool) -> Result<()> {
    let config = load_config(config_path)?;

    let client = GitClient::open_or_clone(
        &config.clone.dir,
        &config.upstream.url,
        &config.upstream.remote,
    )
    .context("failed to open or clone the upstream repository")?;
    client
        .add_remote(&config.downstream.remote, &config.downstream.url)
        .context("failed to add the downstream remote")?;

    if refetch || config.clone.refetch {
        info!("refetching remotes");
        client.fetch(&config.upstream.remote)?;
        client.fetch(&config.downstream.remote)?;
    }

    let upstream_tip = format!("{}/{}", config.upstream.remote, config.upstream.rev);
    let downstream_tip = format!("{}/{}", config.downstream.remote, config.downstream.rev);

    let merge_base = client.merge_base(&upstream_tip, &downstream_tip)?;
    let downstream = client.commits_between(&merge_base, &downstream_tip)?;
    let upstream = client.commits_between(&merge_base, &upstream_tip)?;
    info!(
        downstream = downstream.len(),
        upstream = upstream.len(),
        "walked fork histories"
    );

    let out = reconcile(&downstream, &upstream);
    let merge_base_meta = client.commit_meta(&merge_base)?;

    let data = SyncData {
        meta: SyncMeta {
            upstream_url: config.upstream.url.clone(),
            upstream_rev: config.upstream.rev.clone(),
            downstream_url: config.downstream.url.clone(),
            downstream_rev: config.downstream.rev.clone(),
            collected_at: Utc::now().timestamp(),
        },
        merge_base: annotate(&merge_base_meta, false),
        downstream_commits: out.downstream_commits,
        upstream_commits: out.upstream_commits,
    };

    let json = serde_json::to_string(&data).context("failed to serialize sync data")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Sync data written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_push_metrics(config_path: &str, input: &Path, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;

    let contents = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let data: SyncData =
        serde_json::from_str(&contents).context("failed to parse sync data JSON")?;

    let entry = derive_entry(&data, &config.influx.measurement);

    if dry_run {
        print_entry(&entry);
        return Ok(());
    }

    let token = config
        .influx
        .token
        .clone()
        .ok_or(MetricsError::MissingToken)?;
    let client = InfluxClient::new(
        &config.influx.url,
        &config.influx.org,
        &config.influx.bucket,
        token,
    );
    client
        .write_entry(&entry)
        .await
        .context("failed to push metrics entry")?;

    println!("✓ Metrics entry pushed to {}", config.influx.url);
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", output.display());
    }
    std::fs::write(output, AppConfig::default_toml())
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("✓ Wrote default configuration to {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: &str) -> Result<()> {
    let config = AppConfig::load_and_resolve(config_path).context("configuration is invalid")?;
    println!(
        "✓ Configuration OK (upstream {}, downstream {})",
        config.upstream.url, config.downstream.url
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_entry(entry: &MetricsEntry) {
    println!("measurement: {}", entry.measurement);
    for (key, value) in &entry.tags {
        println!("tag: {key}={value}");
    }
    println!("time: {}", entry.time_rfc3339());

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    for (key, value) in &entry.fields {
        table.add_row(vec![key.clone(), value.to_string()]);
    }
    println!("{table}");
}
