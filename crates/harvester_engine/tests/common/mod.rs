#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use harvester_core::{ElementRef, ErrorKind, ItemId, ParentRecord, Window};
use harvester_engine::{
    FeedHandle, FeedSource, FieldKey, FieldValue, HarvestSettings, ProgressSink, RunEvent,
    SourceError, TailChange,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn test_settings() -> HarvestSettings {
    HarvestSettings {
        settle_delay: Duration::ZERO,
        wait_timeout: Duration::from_millis(10),
        harvested_at: Arc::new(fixed_time),
        ..HarvestSettings::default()
    }
}

pub fn record(id: &str) -> ParentRecord {
    ParentRecord {
        id: id.to_string(),
        name: format!("Place {id}"),
        feed_url: feed_url(id),
        expected_item_count: 0,
        closed: false,
        has_feed: true,
        popular_times: None,
    }
}

pub fn feed_url(id: &str) -> String {
    format!("https://feeds.example.com/{id}")
}

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub id: ItemId,
    pub author: String,
    pub text: String,
    pub rating: usize,
    pub trusted: bool,
    pub endorsements: Option<String>,
    pub subtitle: Option<String>,
    /// Full text is hidden behind an expand control until expanded.
    pub expandable: bool,
    pub translated: bool,
}

impl FakeItem {
    pub fn new(id: ItemId, text: &str) -> Self {
        Self {
            id,
            author: format!("author {id}"),
            text: text.to_string(),
            rating: 4,
            trusted: false,
            endorsements: None,
            subtitle: None,
            expandable: false,
            translated: false,
        }
    }
}

/// Ids with gaps, so tests never rely on positions matching ids.
pub fn items(count: usize) -> Vec<FakeItem> {
    (0..count as u64)
        .map(|n| FakeItem::new(1000 + n * 3, "lovely staff"))
        .collect()
}

/// Scripted lazily rendered feed.
#[derive(Debug, Clone)]
pub struct FakeFeed {
    pub items: Vec<FakeItem>,
    pub declared: Option<u32>,
    pub initial: usize,
    pub batch: usize,
    pub open_error: Option<ErrorKind>,
    pub stale: BTreeSet<ItemId>,
    head: usize,
    rendered: usize,
    more_requested: bool,
    expanded: BTreeSet<ItemId>,
}

impl FakeFeed {
    pub fn new(items: Vec<FakeItem>) -> Self {
        Self {
            declared: Some(items.len() as u32),
            items,
            initial: 10,
            batch: 10,
            open_error: None,
            stale: BTreeSet::new(),
            head: 0,
            rendered: 0,
            more_requested: false,
            expanded: BTreeSet::new(),
        }
    }

    pub fn declared(mut self, declared: u32) -> Self {
        self.declared = Some(declared);
        self
    }

    pub fn rendering(mut self, initial: usize, batch: usize) -> Self {
        self.initial = initial;
        self.batch = batch;
        self
    }

    fn reset(&mut self) {
        self.head = 0;
        self.rendered = self.initial.min(self.items.len());
        self.more_requested = false;
        self.expanded.clear();
    }

    fn window(&self) -> Window {
        Window::new(
            self.items[self.head..self.rendered]
                .iter()
                .map(|item| ElementRef(item.id))
                .collect(),
        )
    }

    fn live_item(&self, element: ElementRef) -> Result<&FakeItem, SourceError> {
        if self.stale.contains(&element.id()) {
            return Err(SourceError::stale(element));
        }
        self.items[self.head..self.rendered]
            .iter()
            .find(|item| item.id == element.id())
            .ok_or_else(|| SourceError::stale(element))
    }
}

/// What a [`FakeSource`] observed while being driven.
#[derive(Debug, Default, Clone)]
pub struct Observed {
    pub opened: Vec<String>,
    pub closed: usize,
    pub evictions: Vec<(ItemId, usize)>,
    pub max_live: usize,
    /// Smallest live count left behind by an eviction.
    pub min_live_after_eviction: Option<usize>,
    pub expanded: Vec<ItemId>,
}

/// Feed source serving one [`FakeFeed`] per feed URL (query ignored).
#[derive(Debug, Default)]
pub struct FakeSource {
    feeds: BTreeMap<String, FakeFeed>,
    open: Option<(FeedHandle, String)>,
    next_handle: u64,
    pub observed: Observed,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, record_id: &str, feed: FakeFeed) -> Self {
        self.feeds.insert(feed_url(record_id), feed);
        self
    }

    fn current(&mut self, handle: FeedHandle) -> Result<&mut FakeFeed, SourceError> {
        match &self.open {
            Some((open, url)) if *open == handle => self
                .feeds
                .get_mut(url)
                .ok_or_else(|| SourceError::new(ErrorKind::Unclassified, "feed vanished")),
            _ => Err(SourceError::new(ErrorKind::Unclassified, "feed not open")),
        }
    }

    fn track_live(&mut self, live: usize) {
        self.observed.max_live = self.observed.max_live.max(live);
    }
}

impl FeedSource for FakeSource {
    fn open(&mut self, url: &str) -> Result<FeedHandle, SourceError> {
        self.observed.opened.push(url.to_string());
        let base = url.split('?').next().unwrap_or(url).to_string();
        let feed = self
            .feeds
            .get_mut(&base)
            .ok_or_else(|| SourceError::new(ErrorKind::LoadError, format!("no feed at {url}")))?;
        if let Some(kind) = feed.open_error {
            return Err(SourceError::new(kind, "page never became ready"));
        }
        feed.reset();
        let live = feed.rendered;

        self.next_handle += 1;
        let handle = FeedHandle(self.next_handle);
        self.open = Some((handle, base));
        self.track_live(live);
        Ok(handle)
    }

    fn declared_count(&mut self, feed: FeedHandle) -> Result<u32, SourceError> {
        self.current(feed)?
            .declared
            .ok_or_else(|| SourceError::new(ErrorKind::NotFound, "no declared count"))
    }

    fn current_window(&mut self, feed: FeedHandle) -> Result<Window, SourceError> {
        Ok(self.current(feed)?.window())
    }

    fn trigger_more(&mut self, feed: FeedHandle) {
        if let Ok(feed) = self.current(feed) {
            feed.more_requested = true;
        }
    }

    fn wait_for_tail_change(
        &mut self,
        feed: FeedHandle,
        previous_tail: Option<ElementRef>,
        _timeout: Duration,
    ) -> Result<TailChange, SourceError> {
        let feed = self.current(feed)?;
        if std::mem::take(&mut feed.more_requested) {
            feed.rendered = (feed.rendered + feed.batch).min(feed.items.len());
        }
        let window = feed.window();
        let live = window.live.len();
        self.track_live(live);
        match window.tail() {
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
        let feed = self.current(feed)?;
        if feed.items.get(feed.head).map(|item| item.id) != Some(from.id()) {
            return Err(SourceError::stale(from));
        }
        feed.head = (feed.head + count).min(feed.rendered);
        let window = feed.window();
        let live = window.live.len();
        self.observed.evictions.push((from.id(), count));
        self.observed.min_live_after_eviction = Some(
            self.observed
                .min_live_after_eviction
                .map_or(live, |min| min.min(live)),
        );
        Ok(window.head)
    }

    fn read_field(
        &mut self,
        feed: FeedHandle,
        element: ElementRef,
        key: FieldKey,
    ) -> Result<Option<FieldValue>, SourceError> {
        let feed = self.current(feed)?;
        let expanded = feed.expanded.contains(&element.id());
        let item = feed.live_item(element)?;
        let value = match key {
            FieldKey::Author => Some(FieldValue::Text(item.author.clone())),
            FieldKey::Text if item.expandable && !expanded => {
                let cut: String = item.text.chars().take(10).collect();
                Some(FieldValue::Text(format!("{cut}…")))
            }
            FieldKey::Text => Some(FieldValue::Text(item.text.clone())),
            FieldKey::RatingMarkers => Some(FieldValue::Count(item.rating)),
            FieldKey::RelativeTime => Some(FieldValue::Text("2 weeks ago".to_string())),
            FieldKey::TrustedBadge => item.trusted.then_some(FieldValue::Visible(true)),
            FieldKey::EndorsementCount => item.endorsements.clone().map(FieldValue::Text),
            FieldKey::AuthorSubtitle => item.subtitle.clone().map(FieldValue::Text),
            FieldKey::ExpandControl => item
                .expandable
                .then_some(FieldValue::Visible(!expanded)),
            FieldKey::TranslationMarker => item.translated.then_some(FieldValue::Visible(true)),
        };
        Ok(value)
    }

    fn expand(&mut self, feed: FeedHandle, element: ElementRef) -> Result<(), SourceError> {
        let feed = self.current(feed)?;
        feed.live_item(element)?;
        feed.expanded.insert(element.id());
        self.observed.expanded.push(element.id());
        Ok(())
    }

    fn close(&mut self, feed: FeedHandle) {
        if self.open.as_ref().is_some_and(|(open, _)| *open == feed) {
            self.open = None;
            self.observed.closed += 1;
        }
    }
}

#[derive(Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}
