//! Issue metadata requests: URL construction, status handling and decoding.

use crate::error::SyncError;
use crate::types::{AttachmentRef, IssueResponse, ProbeOutcome};

/// How an issue response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IssueStatus {
    /// 2xx: decode the body.
    Readable,
    /// 403 or 404: skip the id.
    Gap,
    /// Anything else aborts the walk.
    Fatal,
}

/// Constructs the JSON URL for an issue.
///
/// # Arguments
///
/// * `base_url` - Redmine base URL without trailing slash
/// * `issue_id` - The issue identifier
/// * `include_attachments` - Whether to add the `include=attachments` directive
pub(crate) fn issue_url(base_url: &str, issue_id: u64, include_attachments: bool) -> String {
    if include_attachments {
        format!("{}/issues/{}.json?include=attachments", base_url, issue_id)
    } else {
        format!("{}/issues/{}.json", base_url, issue_id)
    }
}

pub(crate) fn classify_issue_status(status: u16) -> IssueStatus {
    match status {
        403 | 404 => IssueStatus::Gap,
        200..=299 => IssueStatus::Readable,
        _ => IssueStatus::Fatal,
    }
}

/// Maps a probe response status to an outcome.
///
/// Only 404 marks the end of the live range. A 403 issue exists but is
/// hidden from this key, so it still counts.
pub(crate) fn classify_probe_status(status: u16, url: &str) -> Result<ProbeOutcome, SyncError> {
    match status {
        404 => Ok(ProbeOutcome::NotFound),
        403 | 200..=299 => Ok(ProbeOutcome::Exists),
        _ => Err(SyncError::HttpStatus {
            status,
            url: url.to_string(),
        }),
    }
}

/// Decodes an issue body into its attachment list.
pub(crate) fn decode_issue(
    url: &str,
    issue_id: u64,
    body: &[u8],
) -> Result<Vec<AttachmentRef>, SyncError> {
    let issue: IssueResponse = serde_json::from_slice(body).map_err(|e| SyncError::Protocol {
        url: url.to_string(),
        reason: format!("{} (expected an object with issue.attachments)", e),
    })?;
    Ok(issue.into_attachments(issue_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_url() {
        assert_eq!(
            issue_url("https://r.example", 42, true),
            "https://r.example/issues/42.json?include=attachments"
        );
        assert_eq!(
            issue_url("https://r.example", 42, false),
            "https://r.example/issues/42.json"
        );
    }

    #[test]
    fn test_issue_status_classes() {
        assert_eq!(classify_issue_status(200), IssueStatus::Readable);
        assert_eq!(classify_issue_status(403), IssueStatus::Gap);
        assert_eq!(classify_issue_status(404), IssueStatus::Gap);
        assert_eq!(classify_issue_status(401), IssueStatus::Fatal);
        assert_eq!(classify_issue_status(500), IssueStatus::Fatal);
    }

    #[test]
    fn test_probe_status() {
        assert_eq!(
            classify_probe_status(404, "u").unwrap(),
            ProbeOutcome::NotFound
        );
        assert_eq!(classify_probe_status(200, "u").unwrap(), ProbeOutcome::Exists);
        assert_eq!(classify_probe_status(403, "u").unwrap(), ProbeOutcome::Exists);
        let err = classify_probe_status(503, "u").unwrap_err();
        assert!(matches!(err, SyncError::HttpStatus { status: 503, .. }));
    }

    #[test]
    fn test_decode_garbage_is_protocol_error() {
        let err = decode_issue("https://r.example/issues/1.json", 1, b"<html>").unwrap_err();
        match err {
            SyncError::Protocol { url, .. } => assert_eq!(url, "https://r.example/issues/1.json"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
