use anyhow::Context;
use clap::Parser;
use redminesync::{
    list_attachments, resolve_range, sync, RedmineClient, SyncConfig, DEFAULT_MAX_PROBE_ID,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "redminesync")]
#[command(
    about = "Download all reachable attachments from Redmine into a local folder",
    long_about = "Download all reachable attachments from Redmine into a local folder.\n\n\
                  Files land at <sync-dir>/<issue>/attachments/download/<id>/<filename>. \
                  Files already present are not downloaded again."
)]
#[command(version)]
struct Args {
    /// Redmine base URL
    #[arg(short = 'u', long, env = "REDMINE_URL")]
    base_url: String,

    /// Redmine API key. Prefer the REDMINE_API_KEY environment variable,
    /// since flags are visible in process listings.
    #[arg(short = 'k', long, env = "REDMINE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Sync directory (default: ~/.redminesync)
    #[arg(short = 'd', long)]
    sync_dir: Option<PathBuf>,

    /// Start with this issue number
    #[arg(short = 'f', long = "from", default_value_t = 1)]
    start_id: u64,

    /// End with this issue number (default: find the max issue number)
    #[arg(short = 't', long = "to")]
    end_id: Option<u64>,

    /// Upper limit when searching for the max issue number
    #[arg(long, default_value_t = DEFAULT_MAX_PROBE_ID)]
    max_probe: u64,

    /// Only list attachments (issue, id, size, url) on stdout, download nothing
    #[arg(short, long)]
    list: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn default_sync_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".redminesync"))
        .unwrap_or_else(|| PathBuf::from(".redminesync"))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = SyncConfig::new(
        args.base_url,
        args.api_key,
        args.sync_dir.unwrap_or_else(default_sync_dir),
    );
    config.start_id = args.start_id;
    config.end_id = args.end_id;
    config.max_probe_id = args.max_probe;

    let client = RedmineClient::new(&config).context("failed to build HTTP client")?;
    let started = Instant::now();

    if args.list {
        let range = resolve_range(&client, &config).await?;
        let mut out = std::io::stdout().lock();
        let lines = list_attachments(&client, range, &mut out).await?;
        info!("listed {} attachments", lines);
        return Ok(());
    }

    let summary = sync(&client, &config).await?;
    info!(
        "visited {} issues ({} skipped), {} attachments: {} downloaded ({} bytes), {} already present",
        summary.issues_visited,
        summary.gaps_skipped,
        summary.attachments_seen,
        summary.downloaded,
        summary.bytes_written,
        summary.already_present
    );
    info!(
        "✅ sync completed in {}",
        humantime::format_duration(std::time::Duration::from_secs(
            started.elapsed().as_secs()
        ))
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing; stdout is reserved for --list output
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("redminesync={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
