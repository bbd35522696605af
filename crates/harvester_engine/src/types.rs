use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use harvester_core::{Checkpoint, ErrorKind, InclusionPolicy, RecordId, RecordProgress, DEFAULT_RETENTION};

/// Source of `harvested_at` timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Clone)]
pub struct HarvestSettings {
    /// Localization requested from the provider (`hl` query parameter).
    pub language: String,
    pub policy: InclusionPolicy,
    pub retention_window: usize,
    pub wait_timeout: Duration,
    /// Pause after opening a feed so the first window can settle.
    pub settle_delay: Duration,
    pub harvested_at: Clock,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            policy: InclusionPolicy::default(),
            retention_window: DEFAULT_RETENTION,
            wait_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(1),
            harvested_at: system_clock(),
        }
    }
}

impl fmt::Debug for HarvestSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestSettings")
            .field("language", &self.language)
            .field("policy", &self.policy)
            .field("retention_window", &self.retention_window)
            .field("wait_timeout", &self.wait_timeout)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BeforeResumeKey,
    AlreadyHarvested,
    Closed,
    NoFeed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RecordStarted {
        record_id: RecordId,
        position: usize,
        total: usize,
    },
    Progress(RecordProgress),
    RecordSkipped {
        record_id: RecordId,
        reason: SkipReason,
    },
    RecordFinished {
        record_id: RecordId,
        harvested: usize,
        declared: u32,
        interruption: Option<ErrorKind>,
    },
    Halted(Checkpoint),
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: RunEvent) {}
}
