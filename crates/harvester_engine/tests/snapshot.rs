mod common;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use harvester_core::{ElementRef, ErrorKind, StopReason};
use harvester_engine::{
    snapshot_filename, FeedSelectors, FeedSource, FieldKey, FieldValue, HarvestLoop, NullSink,
    RenderSettings, SnapshotError, SnapshotFeedSource, TailChange,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{init_logging, record, test_settings};

const FEED_URL: &str = "https://maps.example.com/place?cid=77";

fn review(id: u64) -> String {
    let badge_style = if id % 2 == 0 { "" } else { r#" style="display: none""# };
    let mut stars = String::new();
    for _ in 0..(id % 5 + 1) {
        stars.push_str(r#"<span class="section-review-star-active"></span>"#);
    }
    format!(
        r#"<div data-review-id="{id}">
  <div class="section-review-title"><span>Author {id}</span></div>
  <div class="section-review-subtitle-local-guide"{badge_style}>Local Guide</div>
  <div class="section-review-subtitle">Local Guide · 1,0{id:02} reviews</div>
  <div class="section-review-stars">{stars}</div>
  <span class="section-review-publish-date">3 months ago</span>
  <span class="section-review-text">Review number {id}</span>
  <button jsaction="pane.review.expandReview">More</button>
  <span class="section-review-thumbs-up-count">{id}</span>
</div>"#
    )
}

fn write_snapshot(dir: &Path, url: &str, ids: impl IntoIterator<Item = u64>, declared: &str) {
    let mut body = String::new();
    for id in ids {
        let _ = writeln!(body, "{}", review(id));
    }
    let html = format!(
        r#"<html><body>
<button jsaction="pane.rating.moreReviews">{declared}</button>
<div class="section-layout">{body}</div>
</body></html>"#
    );
    fs::write(dir.join(snapshot_filename(url)), html).unwrap();
}

fn source(dir: &Path) -> SnapshotFeedSource {
    SnapshotFeedSource::new(dir, &FeedSelectors::default(), RenderSettings::default()).unwrap()
}

#[test]
fn snapshot_replays_as_a_lazy_feed() {
    init_logging();
    let temp = TempDir::new().unwrap();
    write_snapshot(temp.path(), FEED_URL, 1..=35, "35 reviews");

    let mut place = record("p1");
    place.feed_url = FEED_URL.to_string();
    let mut source = source(temp.path());
    let settings = test_settings();
    let result = HarvestLoop::new(&mut source, &settings, &NullSink).harvest(&place);

    assert_eq!(result.stop_reason, Some(StopReason::Complete));
    assert_eq!(result.declared_count, 35);
    let ids: Vec<_> = result.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, (1..=35).collect::<Vec<_>>());

    let first = &result.items[0];
    assert_eq!(first.author_name, "Author 1");
    assert_eq!(first.text, "Review number 1");
    assert_eq!(first.rating, 2);
    assert_eq!(first.relative_time, "3 months ago");
    assert!(!first.is_trusted_contributor);
    assert_eq!(first.endorsement_count, 1);
    assert_eq!(first.other_items_by_author, 1001);
    assert!(result.items[1].is_trusted_contributor);
}

#[test]
fn missing_snapshot_is_a_load_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut source = source(temp.path());
    let settings = test_settings();

    let result = HarvestLoop::new(&mut source, &settings, &NullSink).harvest(&record("p1"));
    assert_eq!(
        result.interruption.map(|i| i.kind),
        Some(ErrorKind::LoadError)
    );
}

#[test]
fn evicted_elements_become_stale() {
    let temp = TempDir::new().unwrap();
    write_snapshot(temp.path(), FEED_URL, 1..=12, "12 reviews");
    let mut source = source(temp.path());

    let feed = source.open(FEED_URL).unwrap();
    assert_eq!(source.declared_count(feed).unwrap(), 12);
    assert_eq!(source.current_window(feed).unwrap().live.len(), 10);

    let head = source.evict(feed, ElementRef(1), 4).unwrap();
    assert_eq!(head, Some(ElementRef(5)));

    let err = source
        .read_field(feed, ElementRef(2), FieldKey::Author)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StaleReference);

    source.trigger_more(feed);
    let window_tail = source
        .wait_for_tail_change(feed, Some(ElementRef(10)), Duration::from_millis(1))
        .unwrap();
    assert_eq!(window_tail, TailChange::Changed(ElementRef(12)));
    assert_eq!(source.current_window(feed).unwrap().live.len(), 8);

    // Nothing left to render.
    source.trigger_more(feed);
    let again = source
        .wait_for_tail_change(feed, Some(ElementRef(12)), Duration::from_millis(1))
        .unwrap();
    assert_eq!(again, TailChange::TimedOut);
    source.close(feed);
}

#[test]
fn expand_control_hides_after_expanding() {
    let temp = TempDir::new().unwrap();
    write_snapshot(temp.path(), FEED_URL, 1..=2, "2 reviews");
    let mut source = source(temp.path());
    let feed = source.open(FEED_URL).unwrap();

    let before = source
        .read_field(feed, ElementRef(1), FieldKey::ExpandControl)
        .unwrap();
    assert_eq!(before, Some(FieldValue::Visible(true)));

    source.expand(feed, ElementRef(1)).unwrap();
    let after = source
        .read_field(feed, ElementRef(1), FieldKey::ExpandControl)
        .unwrap();
    assert_eq!(after, Some(FieldValue::Visible(false)));

    let missing = source
        .read_field(feed, ElementRef(1), FieldKey::TranslationMarker)
        .unwrap();
    assert_eq!(missing, None);
}

#[test]
fn invalid_selector_is_rejected() {
    let temp = TempDir::new().unwrap();
    let selectors = FeedSelectors {
        item: "div[".to_string(),
        ..FeedSelectors::default()
    };
    let err = SnapshotFeedSource::new(temp.path(), &selectors, RenderSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, SnapshotError::Selector { .. }));
}
