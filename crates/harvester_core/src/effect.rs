use crate::{ElementRef, Eviction};

/// Work the harvest loop must perform against the feed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestEffect {
    OpenFeed,
    ReadWindow,
    Extract(ElementRef),
    Evict(Eviction),
    /// Request more elements, then block until the tail moves past `previous_tail`.
    LoadMore { previous_tail: Option<ElementRef> },
}
