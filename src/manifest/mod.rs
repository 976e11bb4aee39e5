//! Remote manifest retrieval and source selection.
//!
//! The manifest is a JSON document with a `resources` array. Each resource
//! carries a `url`, a `description`, a `format` tag and a human-readable
//! `date`. It is fetched once per run; failure here is fatal to the run.
//!
//! # Example
//!
//! ```no_run
//! use abide_core::download::HttpClient;
//! use abide_core::manifest::{fetch_manifest, select_sources};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let cancel = CancellationToken::new();
//! let manifest = fetch_manifest(&client, "http://example.com/package", &cancel).await?;
//! for source in select_sources(&manifest) {
//!     println!("{source}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod select;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::download::HttpClient;

pub use error::ManifestError;
pub use select::{SELECTED_FORMAT, SELECTED_YEAR, select_sources};

/// Parsed manifest document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Resource entries in document order.
    pub resources: Vec<ManifestResource>,
}

/// One entry of the manifest's `resources` array.
///
/// Fields that are absent or `null` read as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestResource {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl Manifest {
    /// Parses a manifest from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the text is not well-formed JSON or
    /// has no `resources` array.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ManifestResource {
    /// Creates a resource entry. Mostly useful for tests and tooling.
    #[must_use]
    pub fn new(url: &str, description: &str, format: &str, date: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            description: Some(description.to_string()),
            format: Some(format.to_string()),
            date: Some(date.to_string()),
        }
    }

    /// Resource locator as written in the manifest.
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Format tag, e.g. `exe` or `csv`.
    #[must_use]
    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or_default()
    }

    /// Free-form date string.
    #[must_use]
    pub fn date(&self) -> &str {
        self.date.as_deref().unwrap_or_default()
    }
}

/// Fetches and parses the manifest at `url`.
///
/// Issues a single GET request. The request observes `cancel`, so an
/// interrupt while the manifest is in flight ends the call promptly.
///
/// # Errors
///
/// - [`ManifestError::Fetch`] / [`ManifestError::Status`] on network or
///   protocol failure
/// - [`ManifestError::Parse`] if the body is not a well-formed manifest
/// - [`ManifestError::Cancelled`] if `cancel` fires first
#[instrument(skip(client, cancel))]
pub async fn fetch_manifest(
    client: &HttpClient,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Manifest, ManifestError> {
    info!("fetching manifest");

    let body = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ManifestError::cancelled(url)),
        body = fetch_body(client, url) => body?,
    };

    debug!(bytes = body.len(), "manifest body received");

    let manifest = Manifest::from_json(&body).map_err(|e| ManifestError::parse(url, e))?;

    info!(resources = manifest.resources.len(), "manifest parsed");
    Ok(manifest)
}

async fn fetch_body(client: &HttpClient, url: &str) -> Result<String, ManifestError> {
    let response = client
        .inner()
        .get(url)
        .send()
        .await
        .map_err(|e| ManifestError::fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ManifestError::status(url, status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| ManifestError::fetch(url, e))
}
