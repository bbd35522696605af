//! Harvester engine: feed source contract, harvest loop, persistence and run control.
mod checkpoint;
mod extract;
mod filename;
mod harvest;
mod input;
mod persist;
mod run;
mod snapshot;
mod source;
mod types;

pub use checkpoint::{CheckpointError, CheckpointManager};
pub use extract::ItemExtractor;
pub use filename::snapshot_filename;
pub use harvest::HarvestLoop;
pub use input::{load_parent_records, parse_parent_records, InputError};
pub use persist::{ensure_output_dir, AtomicFileWriter, LogEntry, PersistError, ResultLog};
pub use run::{RunController, RunError, RunSummary};
pub use snapshot::{FeedSelectors, RenderSettings, SnapshotError, SnapshotFeedSource};
pub use source::{FeedHandle, FeedSource, FieldKey, FieldValue, SourceError, TailChange};
pub use types::{
    system_clock, Clock, HarvestSettings, NullSink, ProgressSink, RunEvent, SkipReason,
};
