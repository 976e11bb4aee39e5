//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use abide_core::{DEFAULT_MANIFEST_URL, RunConfig, default_download_path};

/// Download GP practice prescribing data files.
///
/// Fetches the data.gov.uk package manifest, picks the 2012 `exe` resources
/// and downloads them, three at a time, retrying each until it succeeds.
/// Press Ctrl+C to stop starting new downloads.
#[derive(Parser, Debug)]
#[command(name = "abide-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Source data path [default: <desktop>/nhs-data]
    #[arg(short = 'p', long)]
    pub download_path: Option<PathBuf>,

    /// Manifest URL listing the downloadable resources
    #[arg(long, default_value = DEFAULT_MANIFEST_URL)]
    pub manifest_url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the run configuration from the parsed arguments.
    pub fn run_config(&self) -> RunConfig {
        let download_dir = self
            .download_path
            .clone()
            .unwrap_or_else(default_download_path);
        RunConfig::new(download_dir).with_manifest_url(self.manifest_url.clone())
    }

    /// Default log level when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
