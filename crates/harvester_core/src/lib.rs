//! Harvester core: data model, window bookkeeping and the pure per-record
//! harvest state machine.
mod effect;
mod error;
mod model;
mod msg;
pub mod parse;
mod policy;
mod state;
mod update;
mod view_model;
mod window;

pub use effect::HarvestEffect;
pub use error::{classify, Disposition, ErrorKind};
pub use model::{
    Checkpoint, HarvestResult, Interruption, Item, ItemId, Language, ParentRecord, RecordId,
};
pub use msg::HarvestMsg;
pub use policy::InclusionPolicy;
pub use state::{HarvestPhase, HarvestState, StopReason};
pub use update::update;
pub use view_model::RecordProgress;
pub use window::{
    new_since, ElementRef, Eviction, Window, WindowState, WindowTracker, DEFAULT_RETENTION,
};
