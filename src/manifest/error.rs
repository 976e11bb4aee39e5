//! Error types for manifest retrieval.

use thiserror::Error;

/// Errors that abort a run because the manifest could not be obtained.
///
/// None of these are retried: the whole run ends if the manifest is
/// unavailable or malformed.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The request could not be sent or the body could not be read.
    #[error("failed to fetch manifest from {url}: {source}")]
    Fetch {
        /// Manifest URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("failed to fetch manifest from {url}: HTTP {status}")]
    Status {
        /// Manifest URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body is not a well-formed manifest document.
    #[error("failed to parse manifest from {url}: {source}")]
    Parse {
        /// Manifest URL.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Cancellation was observed before the manifest arrived.
    #[error("manifest fetch from {url} cancelled")]
    Cancelled {
        /// Manifest URL.
        url: String,
    },
}

impl ManifestError {
    /// Creates a fetch error from a reqwest error.
    pub fn fetch(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Creates a non-success status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }

    /// Creates a cancellation marker.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns true if this is a parse failure rather than a fetch failure.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
