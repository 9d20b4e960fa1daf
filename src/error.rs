//! Error types for sync operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering issues or mirroring attachments.
///
/// Every variant is fatal to the run. Issues answered with 403 or 404 never
/// become errors; they are reported as [`crate::IssueFetch::Gap`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// Connection or body transfer failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body could not be decoded.
    #[error("malformed response from {url}: {reason}")]
    Protocol { url: String, reason: String },

    /// Unexpected HTTP status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Boundary discovery ran out of range without locating the last issue.
    #[error(
        "no issue boundary found in [0, {max_candidate}]: \
         the probe range is too small or the API key lacks access"
    )]
    BoundaryNotFound { max_candidate: u64 },

    /// Directory creation or file write failure.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error outside the mirror tree, e.g. writing a listing.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// A URL from the configuration or a response could not be used.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl SyncError {
    pub(crate) fn fs(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> SyncError {
        let path = path.into();
        move |source| SyncError::Filesystem { path, source }
    }
}
