//! Main orchestration logic for mirroring attachments.

use crate::boundary::find_max_id;
use crate::client::{Probe, RedmineApi};
use crate::download::{fetch_and_store, StoreOutcome};
use crate::error::SyncError;
use crate::paths::resolve_local_path;
use crate::types::{AttachmentRef, IdRange, IssueFetch, SyncConfig, SyncSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use tracing::{debug, error, info};

/// Determines the closed range of issue ids to walk.
///
/// An explicit, non-zero `end_id` is used verbatim. Otherwise the end is
/// discovered with [`find_max_id`] and logged before returning.
pub async fn resolve_range<P: Probe + ?Sized>(
    probe: &P,
    config: &SyncConfig,
) -> Result<IdRange, SyncError> {
    let end = match config.end_id.filter(|&id| id != 0) {
        Some(end) => end,
        None => {
            info!(
                "discovering max issue id (probing up to {})",
                config.max_probe_id
            );
            let end = find_max_id(probe, config.max_probe_id).await?;
            info!("found max issue number: {}", end);
            end
        }
    };
    Ok(config.start_id..=end)
}

/// Looks up an issue's attachments, folding 403/404 into `None`.
async fn issue_attachments<A: RedmineApi + ?Sized>(
    api: &A,
    issue_id: u64,
) -> Result<Option<Vec<AttachmentRef>>, SyncError> {
    match api.issue_attachments(issue_id).await {
        Ok(IssueFetch::Attachments(attachments)) => Ok(Some(attachments)),
        Ok(IssueFetch::Gap { status }) => {
            debug!("skipping issue {} (HTTP {})", issue_id, status);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Mirrors every attachment of a single issue.
async fn sync_issue<A: RedmineApi + ?Sized>(
    api: &A,
    config: &SyncConfig,
    issue_id: u64,
    summary: &mut SyncSummary,
) -> Result<(), SyncError> {
    let Some(attachments) = issue_attachments(api, issue_id).await? else {
        summary.gaps_skipped += 1;
        return Ok(());
    };

    for attachment in &attachments {
        summary.attachments_seen += 1;
        let dest = resolve_local_path(&config.sync_dir, issue_id, &attachment.content_url)?;
        match fetch_and_store(api, attachment, &dest).await? {
            StoreOutcome::AlreadyPresent => summary.already_present += 1,
            StoreOutcome::Downloaded(n) => {
                summary.downloaded += 1;
                summary.bytes_written += n;
            }
        }
    }
    Ok(())
}

/// Walks `range` in order and mirrors every attachment into `config.sync_dir`.
///
/// Ids answered with 403 or 404 are skipped. Any other failure aborts the
/// remaining range; files written before the failure stay in place.
///
/// # Arguments
///
/// * `api` - Redmine API
/// * `config` - Sync configuration
/// * `range` - Closed range of issue ids, usually from [`resolve_range`]
/// * `pb` - Progress bar advanced once per id (use `ProgressBar::hidden()` to disable)
pub async fn sync_attachments<A: RedmineApi + ?Sized>(
    api: &A,
    config: &SyncConfig,
    range: IdRange,
    pb: &ProgressBar,
) -> Result<SyncSummary, SyncError> {
    let mut summary = SyncSummary::default();

    for issue_id in range {
        pb.set_message(format!("issue {}", issue_id));
        summary.issues_visited += 1;

        if let Err(e) = sync_issue(api, config, issue_id, &mut summary).await {
            error!("aborting at issue {}: {}", issue_id, e);
            pb.abandon_with_message(format!("❌ failed at issue {}", issue_id));
            return Err(e);
        }
        pb.inc(1);
    }

    pb.finish_with_message("✅ done");
    Ok(summary)
}

/// Resolves the range and mirrors it, with a progress bar on stderr.
///
/// This is the main entry point for a sync run.
///
/// # Example
///
/// ```no_run
/// use redminesync::{sync, RedmineClient, SyncConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SyncConfig::new("https://redmine.example", "api-key", "/tmp/mirror");
/// let client = RedmineClient::new(&config)?;
/// let summary = sync(&client, &config).await?;
/// println!("{} files downloaded", summary.downloaded);
/// # Ok(())
/// # }
/// ```
pub async fn sync<A: RedmineApi + ?Sized>(
    api: &A,
    config: &SyncConfig,
) -> Result<SyncSummary, SyncError> {
    info!("syncing redmine attachments to {}", config.sync_dir.display());

    let range = resolve_range(api, config).await?;
    let total = range.end().saturating_add(1).saturating_sub(*range.start());

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg} | {elapsed_precise} elapsed, ETA {eta_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );

    sync_attachments(api, config, range, &pb).await
}

/// Writes the attachment inventory of `range` without downloading anything.
///
/// One tab-separated line per attachment: issue id, attachment id, size
/// and content URL. Gaps are skipped with the same rules as a sync.
/// Returns the number of lines written.
pub async fn list_attachments<A: RedmineApi + ?Sized, W: Write>(
    api: &A,
    range: IdRange,
    out: &mut W,
) -> Result<u64, SyncError> {
    let mut lines = 0;
    for issue_id in range {
        let Some(attachments) = issue_attachments(api, issue_id).await? else {
            continue;
        };
        for a in &attachments {
            writeln!(
                out,
                "{:>5}\t{:>6}\t{:>10}\t{}",
                issue_id, a.id, a.filesize, a.content_url
            )?;
            lines += 1;
        }
    }
    out.flush()?;
    Ok(lines)
}
