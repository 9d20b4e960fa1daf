use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::info;

use crate::error::SyncError;

/// Build the local mirror path of an attachment.
///
/// The layout is `<root>/<issue_id>/<path of content_url>`, so
/// `https://host/attachments/download/7/a.pdf` on issue 42 lands at
/// `<root>/42/attachments/download/7/a.pdf`. Path segments are
/// percent-decoded. Segments that would climb out of the issue directory
/// are rejected.
pub fn resolve_local_path(
    root: &Path,
    issue_id: u64,
    content_url: &str,
) -> Result<PathBuf, SyncError> {
    let invalid = |reason: &str| SyncError::InvalidUrl {
        url: content_url.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(content_url).map_err(|e| invalid(&e.to_string()))?;
    let segments = url
        .path_segments()
        .ok_or_else(|| invalid("URL has no path"))?;

    let mut path = root.join(issue_id.to_string());
    let mut pushed = false;
    for raw in segments.filter(|s| !s.is_empty()) {
        let segment = urlencoding::decode(raw).map_err(|e| invalid(&e.to_string()))?;
        if segment == "." || segment == ".." || segment.contains(['/', '\\']) {
            return Err(invalid("path segment escapes the issue directory"));
        }
        path.push(segment.as_ref());
        pushed = true;
    }

    if !pushed {
        return Err(invalid("URL has no path"));
    }
    Ok(path)
}

/// Create the parent directory of `path` if it does not exist yet.
pub async fn ensure_parent_dir(path: &Path) -> Result<(), SyncError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if tokio::fs::metadata(parent).await.is_ok() {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(SyncError::fs(parent))?;
    info!("created directory: {}", parent.display());
    Ok(())
}
