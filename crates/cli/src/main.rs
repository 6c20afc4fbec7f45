mod config;
mod config_cmd;
mod inspect;
mod output;
mod sync_cmd;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::sync_cmd::SyncArgs;

#[derive(Parser)]
#[command(name = "gridguide", about = "gridguide CLI - windowed TV guide sync engine")]
struct Cli {
    /// Config file to use instead of the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every sync round
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync one viewport against a JSON guide fixture and print the snapshot
    Sync(SyncArgs),

    /// Show the jump marks for a visible time range
    Marks {
        /// Time under the left viewport edge (RFC 3339)
        #[arg(long)]
        left: DateTime<Utc>,

        /// Time under the right viewport edge (RFC 3339)
        #[arg(long)]
        right: DateTime<Utc>,

        /// Override the current time (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the channel window for a vertical scroll position
    Window {
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        scroll_y: f64,

        #[arg(long)]
        height: f64,

        /// Number of visible channels
        #[arg(long)]
        total: usize,
    },

    /// Print the effective configuration
    Config,
}

fn log_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    if let Ok(directive) = "gridguide=info".parse() {
        filter = filter.add_directive(directive);
    }
    if verbose {
        if let Ok(directive) = "gridguide_sync=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let loaded = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync(args) => sync_cmd::run_sync(&loaded.config, args),
        Commands::Marks {
            left,
            right,
            now,
            format,
        } => inspect::run_marks(&loaded.config, left, right, now, format),
        Commands::Window {
            scroll_y,
            height,
            total,
        } => inspect::run_window(&loaded.config, scroll_y, height, total),
        Commands::Config => config_cmd::show_config(&loaded),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
