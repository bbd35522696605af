//! Replays saved feed pages as a lazily rendered [`FeedSource`].
//!
//! A snapshot is the HTML of a fully scrolled feed, stored as
//! `{dir}/{snapshot_filename(feed_url)}`. On open only the first
//! `initial` elements are rendered; each load request renders the next
//! `batch`. Eviction, stale references and expand controls behave like the
//! live widget, so the same harvest code runs offline and in tests.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use harvester_core::{parse, ElementRef, ErrorKind, ItemId, Window};
use scraper::{ElementRef as HtmlElement, Html, Selector};
use thiserror::Error;

use crate::filename::snapshot_filename;
use crate::source::{FeedHandle, FeedSource, FieldKey, FieldValue, SourceError, TailChange};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("snapshot directory {0:?} does not exist")]
    MissingDir(PathBuf),
}

/// CSS selectors locating the logical fields inside a feed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelectors {
    /// Feed elements; each must carry a numeric `data-review-id`.
    pub item: String,
    pub declared_count: String,
    pub author: String,
    pub text: String,
    pub active_rating: String,
    pub relative_time: String,
    pub trusted_badge: String,
    pub endorsement_count: String,
    pub author_subtitle: String,
    pub expand_control: String,
    pub translation_marker: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            item: "div[data-review-id]".to_string(),
            declared_count: r#"button[jsaction="pane.rating.moreReviews"]"#.to_string(),
            author: ".section-review-title".to_string(),
            text: ".section-review-text".to_string(),
            active_rating: ".section-review-star-active".to_string(),
            relative_time: ".section-review-publish-date".to_string(),
            trusted_badge: ".section-review-subtitle-local-guide".to_string(),
            endorsement_count: ".section-review-thumbs-up-count".to_string(),
            author_subtitle: ".section-review-subtitle".to_string(),
            expand_control: r#"button[jsaction="pane.review.expandReview"]"#.to_string(),
            translation_marker: ".section-review-translated".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub initial: usize,
    pub batch: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            initial: 10,
            batch: 10,
        }
    }
}

struct CompiledSelectors {
    item: Selector,
    declared_count: Selector,
    author: Selector,
    text: Selector,
    active_rating: Selector,
    relative_time: Selector,
    trusted_badge: Selector,
    endorsement_count: Selector,
    author_subtitle: Selector,
    expand_control: Selector,
    translation_marker: Selector,
}

impl CompiledSelectors {
    fn compile(selectors: &FeedSelectors) -> Result<Self, SnapshotError> {
        Ok(Self {
            item: compile(&selectors.item)?,
            declared_count: compile(&selectors.declared_count)?,
            author: compile(&selectors.author)?,
            text: compile(&selectors.text)?,
            active_rating: compile(&selectors.active_rating)?,
            relative_time: compile(&selectors.relative_time)?,
            trusted_badge: compile(&selectors.trusted_badge)?,
            endorsement_count: compile(&selectors.endorsement_count)?,
            author_subtitle: compile(&selectors.author_subtitle)?,
            expand_control: compile(&selectors.expand_control)?,
            translation_marker: compile(&selectors.translation_marker)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, SnapshotError> {
    Selector::parse(selector).map_err(|err| SnapshotError::Selector {
        selector: selector.to_string(),
        message: format!("{err:?}"),
    })
}

struct SnapshotElement {
    id: ItemId,
    html: String,
}

struct OpenFeed {
    handle: FeedHandle,
    declared_label: Option<String>,
    elements: Vec<SnapshotElement>,
    rendered: usize,
    /// Indexes into `elements` that are currently live, oldest first.
    live: VecDeque<usize>,
    more_requested: bool,
    expanded: BTreeSet<ItemId>,
}

impl OpenFeed {
    fn window(&self) -> Window {
        Window::new(
            self.live
                .iter()
                .map(|&index| ElementRef(self.elements[index].id))
                .collect(),
        )
    }

    fn position(&self, element: ElementRef) -> Option<usize> {
        self.live
            .iter()
            .position(|&index| self.elements[index].id == element.id())
    }

    fn live_element(&self, element: ElementRef) -> Result<&SnapshotElement, SourceError> {
        self.position(element)
            .map(|pos| &self.elements[self.live[pos]])
            .ok_or_else(|| SourceError::stale(element))
    }
}

pub struct SnapshotFeedSource {
    dir: PathBuf,
    render: RenderSettings,
    selectors: CompiledSelectors,
    open: Option<OpenFeed>,
    next_handle: u64,
}

impl SnapshotFeedSource {
    pub fn new(
        dir: impl Into<PathBuf>,
        selectors: &FeedSelectors,
        render: RenderSettings,
    ) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SnapshotError::MissingDir(dir));
        }
        Ok(Self {
            dir,
            render: RenderSettings {
                initial: render.initial,
                batch: render.batch.max(1),
            },
            selectors: CompiledSelectors::compile(selectors)?,
            open: None,
            next_handle: 1,
        })
    }

    fn feed(&self, handle: FeedHandle) -> Result<&OpenFeed, SourceError> {
        self.open
            .as_ref()
            .filter(|feed| feed.handle == handle)
            .ok_or_else(|| not_open(handle))
    }

    fn feed_mut(&mut self, handle: FeedHandle) -> Result<&mut OpenFeed, SourceError> {
        self.open
            .as_mut()
            .filter(|feed| feed.handle == handle)
            .ok_or_else(|| not_open(handle))
    }

    fn load(&self, url: &str) -> Result<(Option<String>, Vec<SnapshotElement>), SourceError> {
        let path = self.dir.join(snapshot_filename(url));
        let html = fs::read_to_string(&path).map_err(|err| {
            let reason = if err.kind() == io::ErrorKind::NotFound {
                "no snapshot".to_string()
            } else {
                err.to_string()
            };
            SourceError::new(
                ErrorKind::LoadError,
                format!("{url}: {reason} at {}", path.display()),
            )
        })?;

        let document = Html::parse_document(&html);
        let declared_label = document
            .select(&self.selectors.declared_count)
            .next()
            .map(element_text);
        let elements = document
            .select(&self.selectors.item)
            .filter_map(|el| {
                let id = el.value().attr("data-review-id")?.trim().parse().ok()?;
                Some(SnapshotElement { id, html: el.html() })
            })
            .collect();
        Ok((declared_label, elements))
    }

    fn field(&self, html: &str, key: FieldKey, expanded: bool) -> Option<FieldValue> {
        let fragment = Html::parse_fragment(html);
        let s = &self.selectors;
        let first = |selector: &Selector| fragment.select(selector).next();

        match key {
            FieldKey::Author => first(&s.author).map(|el| FieldValue::Text(element_text(el))),
            FieldKey::Text => first(&s.text).map(|el| FieldValue::Text(element_text(el))),
            FieldKey::RatingMarkers => {
                Some(FieldValue::Count(fragment.select(&s.active_rating).count()))
            }
            FieldKey::RelativeTime => {
                first(&s.relative_time).map(|el| FieldValue::Text(element_text(el)))
            }
            FieldKey::TrustedBadge => {
                first(&s.trusted_badge).map(|el| FieldValue::Visible(is_displayed(el)))
            }
            FieldKey::EndorsementCount => {
                first(&s.endorsement_count).map(|el| FieldValue::Text(element_text(el)))
            }
            FieldKey::AuthorSubtitle => fragment
                .select(&s.author_subtitle)
                .last()
                .filter(|el| is_displayed(*el))
                .map(|el| FieldValue::Text(element_text(el))),
            FieldKey::ExpandControl => first(&s.expand_control)
                .map(|el| FieldValue::Visible(!expanded && is_displayed(el))),
            FieldKey::TranslationMarker => {
                first(&s.translation_marker).map(|el| FieldValue::Visible(is_displayed(el)))
            }
        }
    }
}

impl FeedSource for SnapshotFeedSource {
    fn open(&mut self, url: &str) -> Result<FeedHandle, SourceError> {
        let (declared_label, elements) = self.load(url)?;
        let handle = FeedHandle(self.next_handle);
        self.next_handle += 1;

        let rendered = self.render.initial.min(elements.len());
        engine_info!(
            "Replaying snapshot with {} elements ({} rendered initially)",
            elements.len(),
            rendered
        );
        self.open = Some(OpenFeed {
            handle,
            declared_label,
            elements,
            rendered,
            live: (0..rendered).collect(),
            more_requested: false,
            expanded: BTreeSet::new(),
        });
        Ok(handle)
    }

    fn declared_count(&mut self, feed: FeedHandle) -> Result<u32, SourceError> {
        let label = self.feed(feed)?.declared_label.as_deref();
        label.and_then(parse::declared_count).ok_or_else(|| {
            SourceError::new(ErrorKind::NotFound, "declared item count is not rendered")
        })
    }

    fn current_window(&mut self, feed: FeedHandle) -> Result<Window, SourceError> {
        Ok(self.feed(feed)?.window())
    }

    fn trigger_more(&mut self, feed: FeedHandle) {
        if let Ok(open) = self.feed_mut(feed) {
            open.more_requested = true;
        }
    }

    fn wait_for_tail_change(
        &mut self,
        feed: FeedHandle,
        previous_tail: Option<ElementRef>,
        _timeout: Duration,
    ) -> Result<TailChange, SourceError> {
        let batch = self.render.batch;
        let open = self.feed_mut(feed)?;
        let requested = std::mem::take(&mut open.more_requested);
        // A replay has nothing to wait for: either the next batch exists or it never will.
        if requested && open.rendered < open.elements.len() {
            let next = (open.rendered + batch).min(open.elements.len());
            open.live.extend(open.rendered..next);
            open.rendered = next;
        }
        match open.window().tail() {
            Some(tail) if Some(tail) != previous_tail => Ok(TailChange::Changed(tail)),
            _ => Ok(TailChange::TimedOut),
        }
    }

    fn evict(
        &mut self,
        feed: FeedHandle,
        from: ElementRef,
        count: usize,
    ) -> Result<Option<ElementRef>, SourceError> {
        let open = self.feed_mut(feed)?;
        let start = open.position(from).ok_or_else(|| SourceError::stale(from))?;
        let end = (start + count).min(open.live.len());
        open.live.drain(start..end);
        engine_debug!("Evicted {} elements, {} live", end - start, open.live.len());
        Ok(open.window().head)
    }

    fn read_field(
        &mut self,
        feed: FeedHandle,
        element: ElementRef,
        key: FieldKey,
    ) -> Result<Option<FieldValue>, SourceError> {
        let open = self.feed(feed)?;
        let live = open.live_element(element)?;
        let expanded = open.expanded.contains(&element.id());
        Ok(self.field(&live.html, key, expanded))
    }

    fn expand(&mut self, feed: FeedHandle, element: ElementRef) -> Result<(), SourceError> {
        let open = self.feed_mut(feed)?;
        open.live_element(element)?;
        open.expanded.insert(element.id());
        Ok(())
    }

    fn close(&mut self, feed: FeedHandle) {
        if self.open.as_ref().is_some_and(|open| open.handle == feed) {
            self.open = None;
        }
    }
}

fn not_open(handle: FeedHandle) -> SourceError {
    SourceError::new(
        ErrorKind::Unclassified,
        format!("feed handle {} is not open", handle.0),
    )
}

fn element_text(el: HtmlElement<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Saved pages keep hidden badges in the markup; treat `hidden` and inline
/// `display: none` as not displayed.
fn is_displayed(el: HtmlElement<'_>) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() {
        return false;
    }
    value.attr("style").is_none_or(|style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        !compact.to_ascii_lowercase().contains("display:none")
    })
}
