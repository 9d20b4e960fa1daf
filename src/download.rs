//! Attachment download with skip-if-present semantics.

use crate::client::RedmineApi;
use crate::error::SyncError;
use crate::paths::ensure_parent_dir;
use crate::types::AttachmentRef;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What [`fetch_and_store`] did for one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// A file already existed at the destination. No request was made.
    AlreadyPresent,
    /// The body was downloaded. Holds the number of bytes written.
    Downloaded(u64),
}

impl StoreOutcome {
    pub fn bytes_written(&self) -> u64 {
        match self {
            StoreOutcome::AlreadyPresent => 0,
            StoreOutcome::Downloaded(n) => *n,
        }
    }
}

/// Temporary path the body is streamed to before the final rename.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Downloads an attachment to `dest` unless a file is already there.
///
/// An existing file short-circuits before any network call, so a re-run
/// over a partially mirrored range only fetches what is missing. The body
/// goes to `<dest>.part` first and is renamed on completion, so a file at
/// `dest` is always a finished download.
///
/// # Arguments
///
/// * `api` - Redmine API used for the authenticated GET
/// * `attachment` - The attachment to fetch
/// * `dest` - Final local path, usually from [`crate::resolve_local_path`]
pub async fn fetch_and_store<A: RedmineApi + ?Sized>(
    api: &A,
    attachment: &AttachmentRef,
    dest: &Path,
) -> Result<StoreOutcome, SyncError> {
    match tokio::fs::metadata(dest).await {
        Ok(_) => {
            debug!("already present: {}", dest.display());
            return Ok(StoreOutcome::AlreadyPresent);
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(SyncError::fs(dest)(e)),
    }

    ensure_parent_dir(dest).await?;

    let part = part_path(dest);
    let bytes_written = match api.download_attachment(attachment, &part).await {
        Ok(n) => n,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    tokio::fs::rename(&part, dest)
        .await
        .map_err(SyncError::fs(dest))?;

    info!("downloaded [{}]: {}", bytes_written, attachment.content_url);
    Ok(StoreOutcome::Downloaded(bytes_written))
}
