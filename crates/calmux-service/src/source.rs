//! Fetchable calendar source descriptors.

use std::path::PathBuf;

/// One fetchable document-producing location, resolved per request.
///
/// Immutable once resolved; identifies exactly one document and carries the
/// human-readable origin label used for event tagging when the source's own
/// envelope declares no display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarSource {
    /// A static `.ics` document on local storage.
    LocalFile { path: PathBuf, label: String },
    /// A remote HTTP feed.
    RemoteFeed {
        url: String,
        /// Full `Authorization` header value, when the feed requires one.
        auth_header: Option<String>,
        /// Per-source payload bound; only tightens the configured maximum.
        size_limit: Option<u64>,
        label: String,
    },
}

impl CalendarSource {
    /// The origin label for events from this source.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::LocalFile { label, .. } | Self::RemoteFeed { label, .. } => label,
        }
    }

    /// Human-readable location, for logs and error details.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::LocalFile { path, .. } => path.display().to_string(),
            Self::RemoteFeed { url, .. } => url.clone(),
        }
    }
}
