//! redminesync - Mirror every attachment of a Redmine instance to local disk
//!
//! This library walks the sequential issue ids of a Redmine REST API and
//! downloads each issue's attachments into a deterministic directory layout,
//! skipping files that are already present.
//!
//! # Features
//!
//! - **Boundary Discovery**: Binary-search the largest existing issue id
//! - **Idempotent Sync**: Existing files are never fetched twice, so an interrupted run can simply be restarted
//! - **Gap Tolerance**: Missing (404) and hidden (403) issues are skipped
//! - **Inventory Listing**: Print the attachment list without downloading
//!
//! # Example
//!
//! ```no_run
//! use redminesync::{sync, RedmineClient, SyncConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = SyncConfig::new("https://redmine.example", "api-key", "/srv/mirror");
//! config.start_id = 1000;
//!
//! let client = RedmineClient::new(&config)?;
//! sync(&client, &config).await?;
//! # Ok(())
//! # }
//! ```

mod boundary;
mod client;
mod download;
mod error;
mod metadata;
mod orchestrator;
mod paths;
mod types;

pub use boundary::{find_max_id, SearchBound};
pub use client::{Probe, RedmineApi, RedmineClient, API_KEY_HEADER};
pub use download::{fetch_and_store, StoreOutcome};
pub use error::SyncError;
pub use orchestrator::{list_attachments, resolve_range, sync, sync_attachments};
pub use paths::{ensure_parent_dir, resolve_local_path};
pub use types::{
    AttachmentRef, IdRange, IssueFetch, ProbeOutcome, SyncConfig, SyncSummary,
    DEFAULT_MAX_PROBE_ID,
};
