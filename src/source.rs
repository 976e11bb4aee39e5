//! Download-ready source descriptors.
//!
//! A [`SourceFile`] is produced by the manifest selector for every entry that
//! passes the filter. It owns the absolute locator, the human-readable
//! description and the local file name derived from the locator.

use std::fmt;

use url::Url;

/// One selected resource ready to be downloaded.
///
/// The file name is a pure function of the locator: the percent-decoded path
/// with its single leading `/` removed. Two different locators may decode to
/// the same file name; no attempt is made to reconcile that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    url: Url,
    description: String,
    file_name: String,
}

impl SourceFile {
    /// Creates a descriptor from a raw locator string and description.
    ///
    /// The description is trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `url` is not an absolute URL.
    pub fn new(url: &str, description: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url)?;
        Ok(Self::from_url(url, description))
    }

    /// Creates a descriptor from an already parsed locator.
    #[must_use]
    pub fn from_url(url: Url, description: &str) -> Self {
        let file_name = file_name_from_url(&url);
        Self {
            url,
            description: description.trim().to_string(),
            file_name,
        }
    }

    /// Returns the absolute resource locator.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the local file name, relative to the destination directory.
    ///
    /// May contain `/` separators when the locator path has several segments.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.description, self.url)
    }
}

/// Derives the local file name for a locator.
///
/// Strips exactly one leading `/` from the path component and decodes it
/// form-style: `+` becomes a space, then percent escapes are resolved, so an
/// escaped `%2B` still yields a literal `+`. Byte sequences that do not decode to UTF-8 are replaced lossily so the
/// result is always defined.
#[must_use]
pub fn file_name_from_url(url: &Url) -> String {
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned()
}
