use engine_logging::{engine_error, engine_info, engine_warn};
use harvester_core::{
    classify, Checkpoint, Disposition, ErrorKind, HarvestResult, ParentRecord, RecordId,
};
use thiserror::Error;

use crate::checkpoint::{CheckpointError, CheckpointManager};
use crate::harvest::HarvestLoop;
use crate::persist::{LogEntry, PersistError, ResultLog};
use crate::source::FeedSource;
use crate::types::{HarvestSettings, ProgressSink, RunEvent, SkipReason};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("result log error: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Checkpoint consumed at start, if the previous run halted.
    pub resumed_from: Option<Checkpoint>,
    /// Records appended to the log in this run, interrupted ones included.
    pub processed: usize,
    pub skipped_before_resume: usize,
    pub already_harvested: usize,
    /// Records that ended in a retryable interruption.
    pub interrupted: Vec<RecordId>,
    /// Checkpoint written when the run halted.
    pub halted: Option<Checkpoint>,
}

/// Harvests parent records one after another in id order.
///
/// Records before the resume key and records the log already holds as
/// complete are skipped. Each processed record is appended to the log as soon
/// as it reaches a terminal state; a halting failure also writes the
/// checkpoint and stops the run.
pub struct RunController<'a, S: FeedSource + ?Sized> {
    source: &'a mut S,
    settings: &'a HarvestSettings,
    checkpoints: CheckpointManager,
    log: ResultLog,
    sink: &'a dyn ProgressSink,
}

impl<'a, S: FeedSource + ?Sized> RunController<'a, S> {
    pub fn new(
        source: &'a mut S,
        settings: &'a HarvestSettings,
        checkpoints: CheckpointManager,
        log: ResultLog,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            source,
            settings,
            checkpoints,
            log,
            sink,
        }
    }

    pub fn run(&mut self, mut records: Vec<ParentRecord>) -> Result<RunSummary, RunError> {
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records.dedup_by(|a, b| a.id == b.id);

        // Load the log first: a failed read must leave the checkpoint in place.
        let completed = self.log.completed_ids()?;
        let mut summary = RunSummary {
            resumed_from: self.checkpoints.read_and_clear_checkpoint()?,
            ..RunSummary::default()
        };
        if let Some(checkpoint) = &summary.resumed_from {
            engine_info!(
                "Resuming at {} after {}: {}",
                checkpoint.key,
                checkpoint.error_kind,
                checkpoint.message
            );
        }

        let total = records.len();
        for (position, record) in records.into_iter().enumerate() {
            let resume_key = summary.resumed_from.as_ref().map(|c| c.key.as_str());
            if resume_key.is_some_and(|key| record.id.as_str() < key) {
                summary.skipped_before_resume += 1;
                self.skip(&record, SkipReason::BeforeResumeKey);
                continue;
            }
            if completed.contains(&record.id) {
                summary.already_harvested += 1;
                self.skip(&record, SkipReason::AlreadyHarvested);
                continue;
            }

            engine_logging::set_record_context(record.id.as_str());
            let outcome = self.process(record, position, total, &mut summary);
            engine_logging::clear_record_context();

            if let Some(checkpoint) = outcome? {
                summary.halted = Some(checkpoint);
                break;
            }
        }

        engine_info!(
            "Run finished: {} processed, {} interrupted, {} skipped before resume, {} already harvested{}",
            summary.processed,
            summary.interrupted.len(),
            summary.skipped_before_resume,
            summary.already_harvested,
            if summary.halted.is_some() { ", halted" } else { "" }
        );
        Ok(summary)
    }

    /// Harvests and logs one record. Returns the checkpoint when the run must halt.
    fn process(
        &mut self,
        record: ParentRecord,
        position: usize,
        total: usize,
        summary: &mut RunSummary,
    ) -> Result<Option<Checkpoint>, RunError> {
        let record_id = record.id.clone();
        self.sink.emit(RunEvent::RecordStarted {
            record_id: record_id.clone(),
            position,
            total,
        });

        let result = if record.is_harvestable() {
            engine_info!("Harvesting {:?} ({}/{})", record.name, position + 1, total);
            HarvestLoop::new(&mut *self.source, self.settings, self.sink).harvest(&record)
        } else {
            let reason = if record.closed {
                SkipReason::Closed
            } else {
                SkipReason::NoFeed
            };
            self.skip(&record, reason);
            HarvestResult::empty(record)
        };

        let harvested = result.items.len();
        let declared = result.declared_count;
        let interruption = result.interruption.clone();

        let entry = LogEntry {
            record_id: record_id.clone(),
            result,
        };
        if let Err(err) = self.log.append(&entry) {
            engine_error!("Could not persist result: {}", err);
            self.checkpoints
                .write_checkpoint(&record_id, ErrorKind::Unclassified, &err.to_string())?;
            return Err(err.into());
        }
        summary.processed += 1;
        self.sink.emit(RunEvent::RecordFinished {
            record_id: record_id.clone(),
            harvested,
            declared,
            interruption: interruption.as_ref().map(|i| i.kind),
        });

        let Some(interruption) = interruption else {
            return Ok(None);
        };
        match classify(interruption.kind) {
            Disposition::Skip => {
                engine_warn!(
                    "Marked as interrupted, continuing: {} ({})",
                    interruption.kind,
                    interruption.message
                );
                summary.interrupted.push(record_id);
                Ok(None)
            }
            Disposition::Halt => {
                engine_error!(
                    "Halting run: {} ({})",
                    interruption.kind,
                    interruption.message
                );
                let checkpoint = self.checkpoints.write_checkpoint(
                    &interruption.record_id,
                    interruption.kind,
                    &interruption.message,
                )?;
                self.sink.emit(RunEvent::Halted(checkpoint.clone()));
                Ok(Some(checkpoint))
            }
        }
    }

    fn skip(&self, record: &ParentRecord, reason: SkipReason) {
        self.sink.emit(RunEvent::RecordSkipped {
            record_id: record.id.clone(),
            reason,
        });
    }
}
