//! Download orchestration: gate, workers, retry policy and engine.
//!
//! This module streams selected resources to disk with a bounded number of
//! simultaneous transfers, retrying each one until it succeeds or the run is
//! cancelled.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Fixed-capacity admission gate with RAII release
//! - Retry-until-cancel policy with no backoff by default
//! - Cancellation threaded into the network and file I/O
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use abide_core::download::{ConcurrencyGate, HttpClient, RetryPolicy, download_source};
//! use abide_core::source::SourceFile;
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SourceFile::new("http://example.com/2012/pdpi%202012.exe", "Practice data")?;
//! let outcome = download_source(
//!     &HttpClient::new(),
//!     &ConcurrencyGate::new(3)?,
//!     &RetryPolicy::default(),
//!     &source,
//!     Path::new("./nhs-data"),
//!     &CancellationToken::new(),
//! )
//! .await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod gate;
mod retry;
mod worker;

pub use client::HttpClient;
pub use constants::DEFAULT_CONCURRENCY;
pub use engine::{DownloadEngine, EngineError, RunStats};
pub use error::DownloadError;
pub use gate::{ConcurrencyGate, GatePermit};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
pub use worker::{DownloadOutcome, download_source};
