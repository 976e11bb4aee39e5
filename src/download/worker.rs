//! Per-source download worker.
//!
//! One worker runs per selected source. It loops: acquire a gate slot,
//! attempt the transfer, release the slot, then either return or try again
//! according to the [`RetryPolicy`]. Transfer failures never escape the
//! worker; its caller only ever sees a [`DownloadOutcome`].

use std::path::{Component, Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::gate::ConcurrencyGate;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use super::{DownloadError, HttpClient};
use crate::source::SourceFile;

/// How a worker finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The resource was written in full.
    Completed {
        /// Path of the written file.
        path: PathBuf,
        /// Body bytes written by the successful attempt.
        bytes: u64,
        /// Attempts made, including the successful one.
        attempts: u32,
    },

    /// Cancellation was observed; no further attempts were started.
    Cancelled {
        /// Attempts started before cancellation.
        attempts: u32,
    },

    /// The retry policy gave up.
    Abandoned {
        /// Attempts made.
        attempts: u32,
        /// Why the policy stopped.
        reason: String,
    },
}

impl DownloadOutcome {
    /// Returns the number of attempts the worker started.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. }
            | Self::Cancelled { attempts }
            | Self::Abandoned { attempts, .. } => *attempts,
        }
    }

    /// Returns true if the resource was downloaded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Downloads one source into `download_dir`, retrying until success or cancellation.
///
/// Cancellation is checked before every attempt and while waiting for a gate
/// slot, so once `cancel` fires no new attempt starts. An attempt already in
/// flight observes the same token inside the transfer and ends early; the
/// partial file it leaves behind stays on disk.
#[instrument(
    skip(client, gate, policy, source, download_dir, cancel),
    fields(url = %source.url(), file = source.file_name())
)]
pub async fn download_source(
    client: &HttpClient,
    gate: &ConcurrencyGate,
    policy: &RetryPolicy,
    source: &SourceFile,
    download_dir: &Path,
    cancel: &CancellationToken,
) -> DownloadOutcome {
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            debug!(attempts, "cancelled before next attempt");
            return DownloadOutcome::Cancelled { attempts };
        }

        info!("waiting to download");

        let permit = match gate.acquire_or_cancel(cancel).await {
            Ok(Some(permit)) => permit,
            Ok(None) => {
                debug!(attempts, "cancelled while waiting for a slot");
                return DownloadOutcome::Cancelled { attempts };
            }
            Err(e) => {
                warn!(error = %e, "download gate unavailable");
                return DownloadOutcome::Abandoned {
                    attempts,
                    reason: e.to_string(),
                };
            }
        };

        attempts = attempts.saturating_add(1);
        let result = attempt_transfer(client, source, download_dir, cancel).await;
        drop(permit);

        let error = match result {
            Ok((path, bytes)) => {
                info!(path = %path.display(), bytes, attempts, "completed");
                return DownloadOutcome::Completed {
                    path,
                    bytes,
                    attempts,
                };
            }
            Err(e) => e,
        };

        let failure_type = classify_error(&error);
        match policy.should_retry(failure_type, attempts) {
            RetryDecision::Retry { delay, attempt } => {
                warn!(attempt, error = %error, "download failed, retrying");
                if !delay.is_zero() {
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
            RetryDecision::DoNotRetry { reason } => {
                if failure_type == FailureType::Cancelled {
                    info!(attempts, "download cancelled");
                    return DownloadOutcome::Cancelled { attempts };
                }
                warn!(attempts, error = %error, %reason, "giving up on download");
                return DownloadOutcome::Abandoned { attempts, reason };
            }
        }
    }
}

/// Runs one transfer attempt while the caller holds a gate slot.
async fn attempt_transfer(
    client: &HttpClient,
    source: &SourceFile,
    download_dir: &Path,
    cancel: &CancellationToken,
) -> Result<(PathBuf, u64), DownloadError> {
    let path = resolve_target(download_dir, source.file_name())?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    info!(path = %path.display(), "downloading");
    let bytes = client.download_to_path(source.url(), &path, cancel).await?;
    Ok((path, bytes))
}

/// Joins a derived file name onto the download directory.
///
/// The name must be a non-empty relative path made of plain segments; `..`,
/// a root or a drive prefix would write outside `download_dir`.
fn resolve_target(download_dir: &Path, file_name: &str) -> Result<PathBuf, DownloadError> {
    let relative = Path::new(file_name);
    let mut has_segment = false;

    for component in relative.components() {
        match component {
            Component::Normal(_) => has_segment = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DownloadError::unsafe_path(file_name));
            }
        }
    }

    if !has_segment || file_name.ends_with('/') {
        return Err(DownloadError::unsafe_path(file_name));
    }

    Ok(download_dir.join(relative))
}
