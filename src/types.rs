//! Data structures for sync operations.

use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Default upper limit for boundary discovery.
pub const DEFAULT_MAX_PROBE_ID: u64 = 200_000;

/// Configuration for a sync run.
///
/// Built once at startup and only read afterwards.
///
/// # Example
///
/// ```
/// use redminesync::SyncConfig;
///
/// let config = SyncConfig::new("https://redmine.example/", "secret", "/tmp/mirror");
/// assert_eq!(config.base_url, "https://redmine.example");
/// assert_eq!(config.start_id, 1);
/// assert!(config.end_id.is_none());
/// ```
#[derive(Clone)]
pub struct SyncConfig {
    /// Redmine base URL without trailing slash (e.g., `https://redmine.example`)
    pub base_url: String,
    /// Value sent in the `X-Redmine-API-Key` header.
    pub api_key: String,
    /// Root directory of the local mirror.
    pub sync_dir: PathBuf,
    /// First issue id to visit (default: 1).
    pub start_id: u64,
    /// Last issue id to visit. `None` means discover it.
    pub end_id: Option<u64>,
    /// Largest id boundary discovery will consider (default: 200000).
    pub max_probe_id: u64,
}

impl SyncConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sync_dir: impl Into<PathBuf>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            sync_dir: sync_dir.into(),
            start_id: 1,
            end_id: None,
            max_probe_id: DEFAULT_MAX_PROBE_ID,
        }
    }
}

// The API key stays out of debug output.
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("sync_dir", &self.sync_dir)
            .field("start_id", &self.start_id)
            .field("end_id", &self.end_id)
            .field("max_probe_id", &self.max_probe_id)
            .finish()
    }
}

/// Issue payload returned by `GET /issues/{id}.json?include=attachments`.
///
/// Only the attachment list is decoded, everything else is ignored.
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct IssueResponse {
    pub issue: IssueBody,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct IssueBody {
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct RawAttachment {
    pub id: u64,
    pub content_url: String,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub filename: String,
}

impl IssueResponse {
    pub(crate) fn into_attachments(self, issue_id: u64) -> Vec<AttachmentRef> {
        self.issue
            .attachments
            .into_iter()
            .map(|a| AttachmentRef {
                issue_id,
                id: a.id,
                content_url: a.content_url,
                filesize: a.filesize,
                filename: a.filename,
            })
            .collect()
    }
}

/// A downloadable file attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Owning issue id.
    pub issue_id: u64,
    /// Attachment id.
    pub id: u64,
    /// Absolute download URL.
    pub content_url: String,
    /// Size in bytes as reported by the server. Informational only.
    pub filesize: u64,
    /// Suggested filename.
    pub filename: String,
}

/// Outcome of probing a single issue id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Exists,
    NotFound,
}

/// Result of looking up an issue's attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueFetch {
    /// The issue was readable. The list may be empty.
    Attachments(Vec<AttachmentRef>),
    /// The id is absent (404) or hidden (403) and is skipped.
    Gap { status: u16 },
}

/// Counters reported at the end of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub issues_visited: u64,
    pub gaps_skipped: u64,
    pub attachments_seen: u64,
    pub downloaded: u64,
    pub already_present: u64,
    pub bytes_written: u64,
}

/// Closed range of issue ids to walk.
pub type IdRange = RangeInclusive<u64>;
