use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::view_model::RecordProgress;
use crate::{
    ElementRef, ErrorKind, HarvestResult, InclusionPolicy, Interruption, Item, ItemId,
    ParentRecord, RecordId, WindowState, WindowTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarvestPhase {
    #[default]
    Start,
    LoadFeed,
    Expanding,
    /// A batch ended and nothing needed evicting; more elements were requested.
    StopCheck,
    /// A batch ended and processed elements are being evicted.
    Evicting,
    Done,
    Interrupted,
}

impl HarvestPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, HarvestPhase::Done | HarvestPhase::Interrupted)
    }
}

/// Why a harvest reached `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Consumed elements reached the declared count.
    Complete,
    /// The element `at` failed the inclusion policy; later ones are assumed to fail too.
    PolicyCutoff { at: ItemId },
    /// No more elements rendered before the declared count was reached.
    Exhausted { consumed: u32, declared: u32 },
}

/// Per-record harvest state. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestState {
    pub(crate) record_id: RecordId,
    pub(crate) phase: HarvestPhase,
    pub(crate) policy: InclusionPolicy,
    pub(crate) tracker: WindowTracker,
    pub(crate) declared: u32,
    pub(crate) items: Vec<Item>,
    pub(crate) pending: VecDeque<ElementRef>,
    pub(crate) consumed: u32,
    pub(crate) skipped: u32,
    pub(crate) window_seen: bool,
    pub(crate) idle_polls: u32,
    pub(crate) stop: Option<StopReason>,
    pub(crate) interruption: Option<Interruption>,
    dirty: bool,
}

impl HarvestState {
    pub fn new(record_id: impl Into<RecordId>, policy: InclusionPolicy, retention: usize) -> Self {
        Self {
            record_id: record_id.into(),
            phase: HarvestPhase::Start,
            policy,
            tracker: WindowTracker::new(retention),
            declared: 0,
            items: Vec::new(),
            pending: VecDeque::new(),
            consumed: 0,
            skipped: 0,
            window_seen: false,
            idle_polls: 0,
            stop: None,
            interruption: None,
            dirty: false,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn phase(&self) -> HarvestPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn declared(&self) -> u32 {
        self.declared
    }

    /// Elements taken off the feed, including ones skipped as stale.
    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn window(&self) -> WindowState {
        self.tracker.state()
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop.as_ref()
    }

    pub fn interruption(&self) -> Option<&Interruption> {
        self.interruption.as_ref()
    }

    pub fn progress(&self) -> RecordProgress {
        RecordProgress {
            record_id: self.record_id.clone(),
            phase: self.phase,
            harvested: self.items.len(),
            consumed: self.consumed,
            declared: self.declared,
        }
    }

    /// Returns whether progress changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn into_result(self, record: ParentRecord) -> HarvestResult {
        let popular_times = record.popular_times.clone();
        HarvestResult {
            record,
            declared_count: self.declared,
            items: self.items,
            popular_times,
            stop_reason: self.stop,
            interruption: self.interruption,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn finish(&mut self, reason: StopReason) {
        self.phase = HarvestPhase::Done;
        self.stop = Some(reason);
        self.pending.clear();
        self.mark_dirty();
    }

    pub(crate) fn interrupt(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.phase = HarvestPhase::Interrupted;
        self.interruption = Some(Interruption {
            record_id: self.record_id.clone(),
            kind,
            message: message.into(),
        });
        self.pending.clear();
        self.mark_dirty();
    }
}
