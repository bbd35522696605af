use std::collections::VecDeque;
use std::thread;

use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::{
    parse, update, ErrorKind, HarvestEffect, HarvestMsg, HarvestResult, HarvestState,
    ParentRecord, StopReason,
};

use crate::extract::ItemExtractor;
use crate::source::{FeedHandle, FeedSource, TailChange};
use crate::types::{HarvestSettings, ProgressSink, RunEvent};

/// Drives one record's harvest: executes the effects requested by the core
/// state machine against a [`FeedSource`] and feeds the outcomes back.
///
/// The rendering context opened for the record is owned by the loop and
/// closed before [`HarvestLoop::harvest`] returns.
pub struct HarvestLoop<'a, S: FeedSource + ?Sized> {
    source: &'a mut S,
    settings: &'a HarvestSettings,
    extractor: ItemExtractor,
    sink: &'a dyn ProgressSink,
    feed: Option<FeedHandle>,
}

impl<'a, S: FeedSource + ?Sized> HarvestLoop<'a, S> {
    pub fn new(source: &'a mut S, settings: &'a HarvestSettings, sink: &'a dyn ProgressSink) -> Self {
        Self {
            source,
            settings,
            extractor: ItemExtractor::new(settings.harvested_at.clone()),
            sink,
            feed: None,
        }
    }

    pub fn harvest(&mut self, record: &ParentRecord) -> HarvestResult {
        let initial = HarvestState::new(
            record.id.clone(),
            self.settings.policy,
            self.settings.retention_window,
        );
        let (mut state, effects) = update(initial, HarvestMsg::Begin);
        let mut queue: VecDeque<HarvestEffect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            let msg = self.execute(effect, record);
            let (next, effects) = update(state, msg);
            state = next;
            if state.consume_dirty() {
                let window = state.window();
                engine_debug!(
                    "Window {:?}..{:?}, {} live",
                    window.head_id,
                    window.tail_id,
                    window.live_count
                );
                self.sink.emit(RunEvent::Progress(state.progress()));
            }
            queue.extend(effects);
        }

        if let Some(feed) = self.feed.take() {
            self.source.close(feed);
        }

        match (state.stop_reason(), state.interruption()) {
            (Some(StopReason::Exhausted { consumed, declared }), _) => engine_warn!(
                "Feed exhausted after {} of {} declared elements",
                consumed,
                declared
            ),
            (Some(reason), _) => engine_info!(
                "Harvested {} items ({:?}, {} stale skipped)",
                state.items().len(),
                reason,
                state.skipped()
            ),
            (None, Some(interruption)) => engine_warn!(
                "Harvest interrupted after {} items: {} ({})",
                state.items().len(),
                interruption.kind,
                interruption.message
            ),
            (None, None) => {}
        }

        state.into_result(record.clone())
    }

    fn execute(&mut self, effect: HarvestEffect, record: &ParentRecord) -> HarvestMsg {
        let feed = match self.feed {
            Some(feed) => feed,
            None if effect == HarvestEffect::OpenFeed => return self.open(record),
            None => {
                return failed(
                    ErrorKind::Unclassified,
                    format!("{effect:?} requested before the feed was opened"),
                )
            }
        };

        match effect {
            HarvestEffect::OpenFeed => failed(
                ErrorKind::Unclassified,
                "feed opened twice for one record".to_string(),
            ),
            HarvestEffect::ReadWindow => match self.source.current_window(feed) {
                Ok(window) => HarvestMsg::WindowRead(window),
                Err(err) => failed(err.kind, err.message),
            },
            HarvestEffect::Extract(element) => {
                match self.extractor.extract(&mut *self.source, feed, element) {
                    Ok(item) => HarvestMsg::ItemExtracted(item),
                    Err(err) if err.kind == ErrorKind::StaleReference => {
                        engine_debug!("Skipping stale element {}", element.id());
                        HarvestMsg::ElementStale { element }
                    }
                    Err(err) => failed(err.kind, err.message),
                }
            }
            HarvestEffect::Evict(eviction) => {
                match self.source.evict(feed, eviction.from, eviction.count) {
                    Ok(new_head) => HarvestMsg::Evicted {
                        count: eviction.count,
                        new_head,
                    },
                    Err(err) => {
                        engine_warn!("Eviction of {} elements refused: {}", eviction.count, err);
                        HarvestMsg::EvictionSkipped
                    }
                }
            }
            HarvestEffect::LoadMore { previous_tail } => {
                self.source.trigger_more(feed);
                match self.source.wait_for_tail_change(
                    feed,
                    previous_tail,
                    self.settings.wait_timeout,
                ) {
                    Ok(TailChange::Changed(_)) => HarvestMsg::TailChanged,
                    Ok(TailChange::TimedOut) => HarvestMsg::TailTimedOut,
                    Err(err) => failed(err.kind, err.message),
                }
            }
        }
    }

    fn open(&mut self, record: &ParentRecord) -> HarvestMsg {
        let url = match parse::localized_feed_url(&record.feed_url, &self.settings.language) {
            Ok(url) => url,
            Err(err) => {
                return failed(
                    ErrorKind::LoadError,
                    format!("invalid feed url {:?}: {err}", record.feed_url),
                )
            }
        };

        engine_debug!("Opening feed {}", url);
        let feed = match self.source.open(&url) {
            Ok(feed) => feed,
            Err(err) => return failed(err.kind, err.message),
        };
        self.feed = Some(feed);

        if !self.settings.settle_delay.is_zero() {
            thread::sleep(self.settings.settle_delay);
        }

        let expected = record.expected_item_count;
        match self.source.declared_count(feed) {
            Ok(declared) => {
                engine_info!("Feed declares {} items", declared);
                if expected != 0 && expected != declared {
                    engine_warn!(
                        "Record lists {} items but the feed declares {}",
                        expected,
                        declared
                    );
                }
                HarvestMsg::FeedOpened { declared }
            }
            Err(err) if err.kind == ErrorKind::NotFound && expected > 0 => {
                engine_warn!(
                    "No declared count ({}), using the record's {} items",
                    err.message,
                    expected
                );
                HarvestMsg::FeedOpened { declared: expected }
            }
            Err(err) => failed(err.kind, err.message),
        }
    }
}

fn failed(kind: ErrorKind, message: String) -> HarvestMsg {
    HarvestMsg::Failed { kind, message }
}
