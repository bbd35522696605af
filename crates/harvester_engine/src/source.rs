use std::fmt;
use std::time::Duration;

use harvester_core::{parse, ElementRef, ErrorKind, Window};

/// Opaque handle to one open rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedHandle(pub u64);

/// Logical fields a feed element exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Author,
    Text,
    /// Active rating markers (filled stars).
    RatingMarkers,
    RelativeTime,
    /// Local-guide style badge marking a trusted contributor.
    TrustedBadge,
    EndorsementCount,
    /// Free-text line under the author, e.g. "Local Guide · 120 reviews".
    AuthorSubtitle,
    /// "Show more" control that must be invoked before the full text is rendered.
    ExpandControl,
    /// Marker the provider shows on machine-translated text.
    TranslationMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Visible(bool),
    Count(usize),
}

impl FieldValue {
    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Count(n) => Some(n.to_string()),
            FieldValue::Visible(_) => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            FieldValue::Visible(visible) => *visible,
            FieldValue::Text(text) => !text.trim().is_empty(),
            FieldValue::Count(n) => *n > 0,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            FieldValue::Count(n) => *n,
            FieldValue::Text(text) => parse::leading_count(text) as usize,
            FieldValue::Visible(visible) => usize::from(*visible),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailChange {
    Changed(ElementRef),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn stale(element: ElementRef) -> Self {
        Self::new(
            ErrorKind::StaleReference,
            format!("element {} is no longer rendered", element.id()),
        )
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SourceError {}

/// Blocking access to a lazily rendered feed.
///
/// There is no push notification: callers request more elements with
/// [`FeedSource::trigger_more`] and then poll with
/// [`FeedSource::wait_for_tail_change`]. Element references are lookup keys
/// into the current window; using one after eviction fails with
/// [`ErrorKind::StaleReference`].
pub trait FeedSource {
    /// Loads the feed context. Fails with `LoadError` when it never becomes ready.
    fn open(&mut self, url: &str) -> Result<FeedHandle, SourceError>;

    /// Provider-declared total item count. Fails with `NotFound` when absent.
    fn declared_count(&mut self, feed: FeedHandle) -> Result<u32, SourceError>;

    /// Currently rendered elements, oldest first.
    fn current_window(&mut self, feed: FeedHandle) -> Result<Window, SourceError>;

    /// Asks for more elements to be rendered. Fire-and-forget.
    fn trigger_more(&mut self, feed: FeedHandle);

    /// Blocks until the last rendered element differs from `previous_tail`
    /// or `timeout` elapses.
    fn wait_for_tail_change(
        &mut self,
        feed: FeedHandle,
        previous_tail: Option<ElementRef>,
        timeout: Duration,
    ) -> Result<TailChange, SourceError>;

    /// Discards `count` elements starting at `from` and returns the new head.
    fn evict(
        &mut self,
        feed: FeedHandle,
        from: ElementRef,
        count: usize,
    ) -> Result<Option<ElementRef>, SourceError>;

    /// Reads one logical field. `Ok(None)` means the field is absent, which is not an error.
    fn read_field(
        &mut self,
        feed: FeedHandle,
        element: ElementRef,
        key: FieldKey,
    ) -> Result<Option<FieldValue>, SourceError>;

    /// Invokes the element's expand control.
    fn expand(&mut self, feed: FeedHandle, element: ElementRef) -> Result<(), SourceError>;

    /// Releases the rendering context.
    fn close(&mut self, feed: FeedHandle);
}
