//! Abide Downloader Core Library
//!
//! This library fetches the GP practice prescribing data manifest, selects
//! the resources to download, and retrieves them into a local directory with
//! a bounded number of simultaneous transfers.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Run configuration and default paths
//! - [`manifest`] - Manifest retrieval, parsing and source selection
//! - [`source`] - Download-ready source descriptors
//! - [`download`] - Concurrency gate, workers, retry policy and engine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod manifest;
pub mod source;

mod user_agent;

// Re-export commonly used types
pub use config::{DEFAULT_MANIFEST_URL, RunConfig, default_download_path};
pub use download::{
    ConcurrencyGate, DEFAULT_CONCURRENCY, DownloadEngine, DownloadError, DownloadOutcome,
    EngineError, FailureType, HttpClient, RetryDecision, RetryPolicy, RunStats, classify_error,
    download_source,
};
pub use manifest::{Manifest, ManifestError, ManifestResource, fetch_manifest, select_sources};
pub use source::SourceFile;
