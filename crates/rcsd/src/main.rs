//! rcsd — the RCS daemon.
//!
//! Single binary with two modes:
//! - `hub`: placement, sync and status controllers plus the REST API
//! - `standalone`: the hub plus in-process score and work agents per site
//!
//! Site agents share the hub's store, so they only run inside the hub
//! process.
//!
//! # Usage
//!
//! ```text
//! rcsd --config /etc/rcs/rcsd.toml standalone --listen 0.0.0.0:8080 --site site-7
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use rcs_core::DaemonConfig;
use rcs_score::ScoreBounds;
use rcs_state::StateStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,rcsd=debug,rcs=debug";

#[derive(Parser)]
#[command(name = "rcsd", about = "RCS multi-cluster deployment daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Path to rcsd.toml; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the hub controllers and the REST API.
    Hub {
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: SocketAddr,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/rcs")]
        data_dir: PathBuf,
    },
    /// Run the hub with in-process site agents.
    Standalone {
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: SocketAddr,

        #[arg(long, default_value = "/var/lib/rcs")]
        data_dir: PathBuf,

        /// Extra site to simulate (repeatable).
        #[arg(long = "site")]
        sites: Vec<String>,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = DaemonConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Hub { listen, data_dir } => run_hub(config, listen, &data_dir, Vec::new()).await,
        Command::Standalone {
            listen,
            data_dir,
            sites,
        } => {
            let sites = rcsd::merge_sites(&config.score.sites, &sites);
            run_hub(config, listen, &data_dir, sites).await
        }
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("rcs.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, shutting down");
    }
    info!("shutdown signal received");
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }
}

async fn run_hub(
    config: DaemonConfig,
    listen: SocketAddr,
    data_dir: &Path,
    sites: Vec<String>,
) -> anyhow::Result<()> {
    info!(sites = ?sites, "rcs daemon starting");
    let store = open_store(data_dir)?;

    if let Some(seed) = &config.rcs_config {
        rcsd::seed_rcs_config(&store, seed)?;
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let mut handles = rcsd::spawn_controllers(&store, &config.controller, &shutdown_rx);
    if !sites.is_empty() {
        let bounds = ScoreBounds::from_env()?;
        info!(?bounds, "score bounds loaded");
        handles.extend(rcsd::spawn_site_agents(
            &store,
            &sites,
            &config.score,
            bounds,
            &shutdown_rx,
        ));
    }

    // ── API server ─────────────────────────────────────────────

    let router = rcs_api::build_router(store);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listen, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_ctrl_c().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    join_all(handles).await;
    info!("rcs daemon stopped");
    Ok(())
}
