//! CLI entry point for the downloader tool.

use abide_core::{DEFAULT_CONCURRENCY, DownloadEngine, HttpClient, RetryPolicy};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = args.run_config();
    info!(
        download_dir = %config.download_dir.display(),
        manifest_url = %config.manifest_url,
        "Downloader starting"
    );

    // Ctrl+C stops new attempts; in-flight transfers observe the same token.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, winding down");
            interrupt.cancel();
        }
    });

    let engine = DownloadEngine::new(DEFAULT_CONCURRENCY, RetryPolicy::default())?;
    let client = HttpClient::new();

    let stats = engine
        .run(&client, &config, cancel)
        .await
        .with_context(|| format!("download run against {} failed", config.manifest_url))?;

    info!(
        selected = stats.selected(),
        completed = stats.completed(),
        cancelled = stats.cancelled(),
        retried = stats.retried(),
        interrupted = stats.interrupted(),
        "Download complete"
    );

    Ok(())
}
