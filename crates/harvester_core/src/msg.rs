use crate::{ElementRef, ErrorKind, Item, Window};

/// Outcome of one executed effect, fed back into [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestMsg {
    /// Start harvesting the record.
    Begin,
    /// The feed context is ready and reported its declared size.
    FeedOpened { declared: u32 },
    /// Current rendered window, oldest element first.
    WindowRead(Window),
    /// The element at the front of the pending queue was extracted.
    ItemExtracted(Item),
    /// The element at the front of the pending queue vanished before it could be read.
    ElementStale { element: ElementRef },
    /// The feed source discarded `count` elements from the head.
    Evicted {
        count: usize,
        new_head: Option<ElementRef>,
    },
    /// Eviction was refused; the window is left as it is.
    EvictionSkipped,
    /// More elements were rendered after a load request.
    TailChanged,
    /// No new element appeared within the wait bound.
    TailTimedOut,
    /// A record-level failure.
    Failed { kind: ErrorKind, message: String },
}
