//! `feed-harvest`: harvests the item feeds of a set of parent records.
//!
//! Records come from a JSON document keyed by record id. Feeds are replayed
//! from saved snapshots, results are appended to a JSON Lines log and a
//! halted run resumes from its checkpoint on the next invocation.
//!
//! ```bash
//! feed-harvest --input place_detail.json --snapshots ./snapshots \
//!     --output results.jsonl --checkpoint checkpoint.json --config harvest.ron
//! ```

mod config;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use harvester_engine::{
    load_parent_records, CheckpointManager, FeedSelectors, ResultLog, RunController,
    SnapshotFeedSource,
};
use log::LevelFilter;

use crate::config::AppConfig;
use crate::logging::LogDestination;
use crate::progress::LogProgressSink;

/// Exit status of a run that stopped at a checkpoint.
const EXIT_HALTED: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "feed-harvest",
    version,
    about = "Incrementally harvest lazily rendered item feeds with resumable checkpoints"
)]
struct Cli {
    /// Run configuration (RON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON document mapping record ids to record attributes.
    #[arg(long)]
    input: PathBuf,

    /// Directory of saved feed pages, one per feed URL.
    #[arg(long)]
    snapshots: PathBuf,

    /// Append-only result log (JSON Lines).
    #[arg(long, default_value = "results.jsonl")]
    output: PathBuf,

    /// Resume marker written when a run halts.
    #[arg(long, default_value = "checkpoint.json")]
    checkpoint: PathBuf,

    #[arg(long, value_enum, default_value_t = LogDestination::Both)]
    log: LogDestination,

    /// Log file used by the `file` and `both` destinations.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log per-batch progress.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(cli.log, level, cli.log_file.as_deref());

    let config = AppConfig::load(cli.config.as_deref())?;
    let records = load_parent_records(&cli.input)
        .with_context(|| format!("loading records from {}", cli.input.display()))?;
    let mut source = SnapshotFeedSource::new(
        &cli.snapshots,
        &FeedSelectors::default(),
        config.render_settings(),
    )
    .context("opening snapshot directory")?;
    let settings = config.harvest_settings();
    engine_info!("Harvest settings: {:?}", settings);

    let started = Utc::now();
    let summary = RunController::new(
        &mut source,
        &settings,
        CheckpointManager::new(&cli.checkpoint),
        ResultLog::new(&cli.output),
        &LogProgressSink,
    )
    .run(records)
    .context("harvest run failed")?;
    let elapsed = Utc::now() - started;

    engine_info!(
        "{} records processed in {}s, results in {:?}",
        summary.processed,
        elapsed.num_seconds(),
        cli.output
    );
    if !summary.interrupted.is_empty() {
        engine_warn!(
            "Interrupted records will be retried on the next run: {}",
            summary.interrupted.join(", ")
        );
    }

    match summary.halted {
        Some(checkpoint) => {
            engine_warn!(
                "Halted at {} ({}): {}",
                checkpoint.key,
                checkpoint.error_kind,
                checkpoint.message
            );
            Ok(ExitCode::from(EXIT_HALTED))
        }
        None => Ok(ExitCode::SUCCESS),
    }
}
