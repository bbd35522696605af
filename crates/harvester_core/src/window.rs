use serde::{Deserialize, Serialize};

use crate::ItemId;

pub const DEFAULT_RETENTION: usize = 20;

/// Weak handle to a rendered element: a lookup key into the current window.
///
/// Holding one does not keep the element alive; the feed source rejects
/// any use after eviction with a stale-reference error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub ItemId);

impl ElementRef {
    pub fn id(self) -> ItemId {
        self.0
    }
}

/// One observation of the rendered subset of a feed, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Window {
    pub head: Option<ElementRef>,
    pub live: Vec<ElementRef>,
}

impl Window {
    pub fn new(live: Vec<ElementRef>) -> Self {
        Self {
            head: live.first().copied(),
            live,
        }
    }

    pub fn tail(&self) -> Option<ElementRef> {
        self.live.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    pub head_id: Option<ItemId>,
    pub tail_id: Option<ItemId>,
    pub live_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub from: ElementRef,
    pub count: usize,
}

/// Tracks the live window of one feed: which elements were already seen,
/// which were durably extracted, and how many may be evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTracker {
    retention: usize,
    live: Vec<ElementRef>,
    last_seen: Option<ItemId>,
    processed_upto: Option<ItemId>,
}

impl Default for WindowTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl WindowTracker {
    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            live: Vec::new(),
            last_seen: None,
            processed_upto: None,
        }
    }

    pub fn state(&self) -> WindowState {
        WindowState {
            head_id: self.live.first().map(|r| r.id()),
            tail_id: self.live.last().map(|r| r.id()),
            live_count: self.live.len(),
        }
    }

    pub fn tail(&self) -> Option<ElementRef> {
        self.live.last().copied()
    }

    pub fn last_seen(&self) -> Option<ItemId> {
        self.last_seen
    }

    /// Adopts `window` as the current live set and returns the elements
    /// strictly after the last seen one, in feed order.
    pub fn poll_new_elements(&mut self, window: &Window) -> Vec<ElementRef> {
        let fresh = new_since(window, self.last_seen);
        if let Some(last) = fresh.last() {
            self.last_seen = Some(last.id());
        }
        self.live = window.live.clone();
        fresh
    }

    /// Marks every element up to and including `id` as durably extracted.
    pub fn mark_processed(&mut self, id: ItemId) {
        if self.processed_upto.is_none_or(|done| id > done) {
            self.processed_upto = Some(id);
        }
    }

    /// Evicts processed elements from the head while keeping at least
    /// `retention` live elements. `None` when the window is within budget.
    pub fn plan_eviction(&self) -> Option<Eviction> {
        let over_budget = self.live.len().saturating_sub(self.retention);
        let processed = match self.processed_upto {
            Some(done) => self.live.iter().take_while(|r| r.id() <= done).count(),
            None => 0,
        };
        let count = over_budget.min(processed);
        if count == 0 {
            return None;
        }
        Some(Eviction {
            from: self.live[0],
            count,
        })
    }

    /// Applies a confirmed eviction of `count` elements from the head.
    pub fn record_eviction(&mut self, count: usize, new_head: Option<ElementRef>) {
        let count = count.min(self.live.len());
        self.live.drain(..count);
        if let Some(head) = new_head {
            self.live.retain(|r| r.id() >= head.id());
        }
    }
}

/// Elements of `window` strictly after `since`; duplicate or out-of-order ids are dropped.
pub fn new_since(window: &Window, since: Option<ItemId>) -> Vec<ElementRef> {
    let mut cursor = since;
    let mut fresh = Vec::new();
    for element in &window.live {
        if cursor.is_none_or(|last| element.id() > last) {
            cursor = Some(element.id());
            fresh.push(*element);
        }
    }
    fresh
}
