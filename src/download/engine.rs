//! Download engine: the run orchestrator.
//!
//! This module provides the `DownloadEngine`, which fetches the manifest,
//! selects sources, and runs one worker per source behind a shared
//! [`ConcurrencyGate`], observing a cancellation token throughout.
//!
//! # Overview
//!
//! A run moves through fetching, selecting, downloading, done. Manifest
//! failures are fatal and surface as [`EngineError`]. Per-source failures are
//! absorbed by each worker's retry loop and only show up in [`RunStats`].
//!
//! # Example
//!
//! ```no_run
//! use abide_core::config::RunConfig;
//! use abide_core::download::{DownloadEngine, HttpClient, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(3, RetryPolicy::default())?;
//! let config = RunConfig::new("./nhs-data");
//! let stats = engine
//!     .run(&HttpClient::new(), &config, CancellationToken::new())
//!     .await?;
//! println!("Completed: {}, Cancelled: {}", stats.completed(), stats.cancelled());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::gate::ConcurrencyGate;
use super::retry::RetryPolicy;
use super::worker::{DownloadOutcome, download_source};
use super::HttpClient;
use crate::config::{RunConfig, ensure_download_dir};
use crate::manifest::{ManifestError, fetch_manifest, select_sources};
use crate::source::SourceFile;

/// Error type for run-level failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The manifest could not be fetched or parsed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The download directory could not be created.
    #[error("cannot create download directory {path}: {source}")]
    DestinationDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Tally of worker outcomes for one run.
///
/// Informational only: the run ends when every worker has returned, not when
/// some count is reached.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    selected: usize,
    completed: usize,
    cancelled: usize,
    abandoned: usize,
    retried: usize,
    interrupted: bool,
}

impl RunStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sources selected from the manifest.
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Returns the number of sources downloaded in full.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Returns the number of workers that stopped because of cancellation.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Returns the number of workers the retry policy gave up on.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.abandoned
    }

    /// Returns the number of retry attempts made across all workers.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried
    }

    /// Returns the number of workers that finished.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.cancelled + self.abandoned
    }

    /// Returns true if the run observed cancellation.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Completed { .. } => self.completed += 1,
            DownloadOutcome::Cancelled { .. } => self.cancelled += 1,
            DownloadOutcome::Abandoned { .. } => self.abandoned += 1,
        }
        self.retried += outcome.attempts().saturating_sub(1) as usize;
    }

    fn set_interrupted(&mut self) {
        self.interrupted = true;
    }
}

/// Orchestrates one download run.
///
/// # Concurrency Model
///
/// - One Tokio task per selected source, all spawned up front into a `JoinSet`
/// - Every task shares one [`ConcurrencyGate`]; at most `concurrency`
///   transfers run at once and the rest wait for a slot
/// - All tasks are joined before [`run`](Self::run) returns; dropping the
///   future aborts whatever is still running
///
/// # Retry Behavior
///
/// - Each worker retries failed transfers according to the [`RetryPolicy`]
///   (by default: immediately and without limit)
/// - Failures never propagate out of a worker
#[derive(Debug)]
pub struct DownloadEngine {
    /// Admission gate shared by all workers.
    gate: ConcurrencyGate,
    /// Retry policy for failed transfers.
    retry_policy: RetryPolicy,
}

impl DownloadEngine {
    /// Creates a new download engine.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of simultaneous transfers (1-100)
    /// * `retry_policy` - Policy for retrying failed transfers
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use abide_core::download::{DownloadEngine, RetryPolicy};
    ///
    /// let engine = DownloadEngine::new(3, RetryPolicy::default()).unwrap();
    /// assert_eq!(engine.concurrency(), 3);
    /// ```
    #[instrument(level = "debug", skip(retry_policy))]
    pub fn new(concurrency: usize, retry_policy: RetryPolicy) -> Result<Self, EngineError> {
        let gate = ConcurrencyGate::new(concurrency)?;

        debug!(
            concurrency,
            max_attempts = ?retry_policy.max_attempts(),
            delay_ms = retry_policy.delay().as_millis(),
            "creating download engine"
        );

        Ok(Self { gate, retry_policy })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.gate.capacity()
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the shared admission gate.
    #[must_use]
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Runs the whole pipeline: prepare directory, fetch, select, download.
    ///
    /// Selecting nothing is not an error; the run simply completes. If
    /// `cancel` fires while the manifest is in flight, the run ends without
    /// error and nothing is downloaded.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DestinationDir`] if the download directory
    /// cannot be created, and [`EngineError::Manifest`] if the manifest
    /// cannot be fetched or parsed.
    ///
    /// Note: individual download failures do NOT cause this method to error.
    #[instrument(
        skip(self, client, config, cancel),
        fields(download_dir = %config.download_dir.display(), manifest_url = %config.manifest_url)
    )]
    pub async fn run(
        &self,
        client: &HttpClient,
        config: &RunConfig,
        cancel: CancellationToken,
    ) -> Result<RunStats, EngineError> {
        ensure_download_dir(&config.download_dir)
            .await
            .map_err(|source| EngineError::DestinationDir {
                path: config.download_dir.clone(),
                source,
            })?;

        let manifest = match fetch_manifest(client, &config.manifest_url, &cancel).await {
            Ok(manifest) => manifest,
            Err(ManifestError::Cancelled { .. }) => {
                info!("cancelled before the manifest arrived");
                let mut stats = RunStats::new();
                stats.set_interrupted();
                return Ok(stats);
            }
            Err(e) => return Err(e.into()),
        };

        let sources = select_sources(&manifest);
        if sources.is_empty() {
            info!("no sources matched the selection policy");
        }

        Ok(self
            .download_all(client, sources, &config.download_dir, cancel)
            .await)
    }

    /// Downloads every source concurrently and waits for all workers.
    ///
    /// A worker task that panics is logged and left out of the tally; the
    /// remaining workers are unaffected.
    #[instrument(skip(self, client, sources, cancel), fields(download_dir = %download_dir.display()))]
    pub async fn download_all(
        &self,
        client: &HttpClient,
        sources: Vec<SourceFile>,
        download_dir: &Path,
        cancel: CancellationToken,
    ) -> RunStats {
        let mut stats = RunStats::new();
        stats.selected = sources.len();
        let mut tasks = JoinSet::new();

        for source in sources {
            info!(description = source.description(), url = %source.url(), "found source");

            let client = client.clone();
            let gate = self.gate.clone();
            let policy = self.retry_policy.clone();
            let download_dir = download_dir.to_path_buf();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                download_source(&client, &gate, &policy, &source, &download_dir, &cancel).await
            });
        }

        debug!(task_count = tasks.len(), "waiting for downloads to complete");

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => stats.record(&outcome),
                Err(e) => warn!(error = %e, "download task panicked"),
            }
        }

        if cancel.is_cancelled() {
            stats.set_interrupted();
        }

        info!(
            selected = stats.selected(),
            completed = stats.completed(),
            cancelled = stats.cancelled(),
            abandoned = stats.abandoned(),
            retried = stats.retried(),
            interrupted = stats.interrupted(),
            "downloads finished"
        );

        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_new_valid_concurrency() {
        let engine = DownloadEngine::new(1, RetryPolicy::default()).unwrap();
        assert_eq!(engine.concurrency(), 1);

        let engine = DownloadEngine::new(3, RetryPolicy::default()).unwrap();
        assert_eq!(engine.concurrency(), 3);
        assert_eq!(engine.gate().available(), 3);

        let engine = DownloadEngine::new(100, RetryPolicy::default()).unwrap();
        assert_eq!(engine.concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency() {
        assert!(matches!(
            DownloadEngine::new(0, RetryPolicy::default()),
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            DownloadEngine::new(101, RetryPolicy::default()),
            Err(EngineError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_engine_stores_retry_policy() {
        let engine = DownloadEngine::new(3, RetryPolicy::with_max_attempts(5)).unwrap();
        assert_eq!(engine.retry_policy().max_attempts(), Some(5));
    }

    #[test]
    fn test_run_stats_record() {
        let mut stats = RunStats::new();
        stats.record(&DownloadOutcome::Completed {
            path: PathBuf::from("/data/a.exe"),
            bytes: 10,
            attempts: 3,
        });
        stats.record(&DownloadOutcome::Cancelled { attempts: 1 });
        stats.record(&DownloadOutcome::Cancelled { attempts: 0 });
        stats.record(&DownloadOutcome::Abandoned {
            attempts: 2,
            reason: "permanent".to_string(),
        });

        assert_eq!(stats.completed(), 1);
        assert_eq!(stats.cancelled(), 2);
        assert_eq!(stats.abandoned(), 1);
        assert_eq!(stats.retried(), 3);
        assert_eq!(stats.total(), 4);
        assert!(!stats.interrupted());
    }

    #[tokio::test]
    async fn test_download_all_empty_sources() {
        let engine = DownloadEngine::new(3, RetryPolicy::default()).unwrap();
        let stats = engine
            .download_all(
                &HttpClient::new(),
                Vec::new(),
                Path::new("/nonexistent"),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(stats, RunStats::new());
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains('0'));
        assert!(msg.contains("100"));

        let manifest = EngineError::from(ManifestError::status("http://example.com/m", 404));
        assert!(manifest.to_string().contains("404"));
    }
}
