//! Run configuration.
//!
//! A [`RunConfig`] is built once per process (normally from the command
//! line) and handed to the engine. Nothing reads configuration from global
//! state.

use std::path::{Path, PathBuf};

/// Manifest describing the GP practice prescribing data package.
pub const DEFAULT_MANIFEST_URL: &str =
    "http://data.gov.uk/api/2/rest/package/gp-practice-prescribing-data";

/// Folder created under the desktop directory by default.
pub const DEFAULT_DOWNLOAD_FOLDER: &str = "nhs-data";

/// Inputs for one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Directory the selected resources are written into.
    pub download_dir: PathBuf,
    /// Location of the manifest document.
    pub manifest_url: String,
}

impl RunConfig {
    /// Creates a configuration for `download_dir` with the default manifest URL.
    #[must_use]
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
        }
    }

    /// Replaces the manifest URL.
    #[must_use]
    pub fn with_manifest_url(mut self, manifest_url: impl Into<String>) -> Self {
        self.manifest_url = manifest_url.into();
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(default_download_path())
    }
}

/// Returns the default download directory: `<desktop>/nhs-data`.
///
/// Falls back to the home directory, then the current directory, on
/// platforms without a desktop directory.
#[must_use]
pub fn default_download_path() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DOWNLOAD_FOLDER)
}

/// Creates `path` and any missing parents.
///
/// # Errors
///
/// Returns the underlying IO error if the directory cannot be created or a
/// non-directory already exists at `path`.
pub async fn ensure_download_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
