use std::fmt;

use crate::{HarvestPhase, RecordId};

/// Running ratio of harvested against declared items for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordProgress {
    pub record_id: RecordId,
    pub phase: HarvestPhase,
    pub harvested: usize,
    pub consumed: u32,
    pub declared: u32,
}

impl RecordProgress {
    pub fn ratio(&self) -> f64 {
        if self.declared == 0 {
            return 1.0;
        }
        self.harvested as f64 / f64::from(self.declared)
    }
}

impl fmt::Display for RecordProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%)",
            self.harvested,
            self.declared,
            self.ratio() * 100.0
        )
    }
}
