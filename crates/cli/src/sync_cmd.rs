use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gridguide_core::ChannelId;
use gridguide_runtime_config::GuideConfig;
use gridguide_sync::{
    ControllerSettings, FilterSelection, StaticGuideSource, SyncController, ViewportRequest,
};
use tracing::info;

use crate::output::{OutputFormat, SyncReport, print_json, render_snapshot};

#[derive(Debug, clap::Args)]
pub struct SyncArgs {
    /// Guide fixture (JSON) served as the data source
    #[arg(long)]
    pub fixture: PathBuf,

    #[arg(long, default_value_t = 0.0)]
    pub scroll_x: f64,

    #[arg(long, default_value_t = 0.0)]
    pub scroll_y: f64,

    #[arg(long, default_value_t = 1200.0)]
    pub width: f64,

    #[arg(long, default_value_t = 600.0)]
    pub height: f64,

    #[arg(long, default_value_t = 1.0)]
    pub zoom: f64,

    /// Channel name search text
    #[arg(long)]
    pub search: Option<String>,

    /// Channel list id from the fixture, or "all"
    #[arg(long)]
    pub filter: Option<String>,

    /// Channel id to keep inside the channel window
    #[arg(long)]
    pub focus: Option<String>,

    /// Override the current time (RFC 3339)
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn filter_selection(source: &StaticGuideSource, raw: &str) -> Result<FilterSelection> {
    if raw == "all" {
        return Ok(FilterSelection::AllChannels);
    }
    source
        .fixture()
        .channel_lists
        .iter()
        .find(|list| list.id == raw)
        .cloned()
        .map(FilterSelection::List)
        .with_context(|| format!("Unknown channel list {raw:?}"))
}

fn viewport_request(args: &SyncArgs, source: &StaticGuideSource) -> Result<ViewportRequest> {
    let mut request = ViewportRequest::new(args.scroll_y, args.height, args.zoom)
        .with_horizontal(args.scroll_x, args.width);
    if let Some(text) = &args.search {
        request = request.with_search(text.clone());
    }
    if let Some(raw) = &args.filter {
        request = request.with_filter(filter_selection(source, raw)?);
    }
    if let Some(id) = &args.focus {
        request = request.with_focus(ChannelId::new(id.clone()));
    }
    Ok(request)
}

async fn sync_fixture(config: &GuideConfig, args: SyncArgs) -> Result<()> {
    let source = StaticGuideSource::load(&args.fixture)?;
    let request = viewport_request(&args, &source)?;

    let now = args.now.unwrap_or_else(Utc::now);
    let settings =
        ControllerSettings::from_config(now, config).context("Invalid [bounds] configuration")?;
    let geometry = Arc::new(settings.geometry());
    let controller = SyncController::spawn(settings, Arc::new(source), geometry)
        .context("Invalid [window] configuration")?;

    controller.request_window_change(request)?;
    let snapshot = controller.settled().await?;
    let stats = controller.stats();
    controller.shutdown().await;
    info!(
        "Synced {} channels after {} rounds",
        snapshot.channels.len(),
        stats.rounds_applied
    );

    match args.format {
        OutputFormat::Json => print_json(&SyncReport {
            snapshot: &snapshot,
            stats,
        }),
        OutputFormat::Text => {
            print!("{}", render_snapshot(&snapshot, &stats));
            Ok(())
        }
    }
}

pub fn run_sync(config: &GuideConfig, args: SyncArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.sync.worker_threads)
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(sync_fixture(config, args))
}
