//! Source selection policy.

use tracing::{debug, warn};

use super::{Manifest, ManifestResource};
use crate::source::SourceFile;

/// Format tag an entry must carry to be selected.
pub const SELECTED_FORMAT: &str = "exe";

/// Substring an entry's date must contain to be selected.
///
/// Matched literally and case-sensitively; this is not a date range check.
pub const SELECTED_YEAR: &str = "2012";

/// Filters the manifest into download descriptors.
///
/// An entry is selected when its format equals [`SELECTED_FORMAT`] and its
/// date contains [`SELECTED_YEAR`]. Manifest order is preserved and nothing
/// is deduplicated. An empty result is not an error.
///
/// Selected entries whose `url` is not an absolute URL cannot be downloaded
/// and are skipped with a warning.
#[must_use]
pub fn select_sources(manifest: &Manifest) -> Vec<SourceFile> {
    let sources: Vec<SourceFile> = manifest
        .resources
        .iter()
        .filter(|resource| is_selected(resource))
        .filter_map(|resource| match SourceFile::new(resource.url(), resource.description()) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(url = resource.url(), error = %e, "skipping selected entry with invalid URL");
                None
            }
        })
        .collect();

    debug!(
        resources = manifest.resources.len(),
        selected = sources.len(),
        "selected sources"
    );
    sources
}

fn is_selected(resource: &ManifestResource) -> bool {
    resource.format() == SELECTED_FORMAT && resource.date().contains(SELECTED_YEAR)
}
