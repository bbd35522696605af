use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_engine::{ProgressSink, RunEvent, SkipReason};

/// Reports run events through the log. Per-record events rely on the
/// record context prefix for the id.
#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::RecordStarted {
                position, total, ..
            } => engine_info!("Record {} of {}", position + 1, total),
            RunEvent::Progress(progress) => engine_debug!(
                "{} ({:?}, {} consumed)",
                progress,
                progress.phase,
                progress.consumed
            ),
            RunEvent::RecordSkipped { record_id, reason } => match reason {
                SkipReason::BeforeResumeKey | SkipReason::AlreadyHarvested => {
                    engine_debug!("{}: skipped ({:?})", record_id, reason)
                }
                SkipReason::Closed | SkipReason::NoFeed => {
                    engine_info!("{}: no feed to harvest ({:?})", record_id, reason)
                }
            },
            RunEvent::RecordFinished {
                harvested,
                declared,
                interruption: None,
                ..
            } => engine_info!("Done: {} of {} items", harvested, declared),
            RunEvent::RecordFinished {
                harvested,
                declared,
                interruption: Some(kind),
                ..
            } => engine_warn!(
                "Interrupted by {} after {} of {} items",
                kind,
                harvested,
                declared
            ),
            RunEvent::Halted(checkpoint) => engine_warn!(
                "Run halted at {}; rerun to resume from there",
                checkpoint.key
            ),
        }
    }
}
