use harvester_core::{parse, ElementRef, Item, Language};

use crate::source::{FeedHandle, FeedSource, FieldKey, FieldValue, SourceError};
use crate::types::Clock;

/// Converts one rendered feed element into an [`Item`].
///
/// Optional fields are read defensively: a missing or hidden sub-element
/// yields `false`/`0`, never an error. The only failure is the element
/// itself disappearing (`StaleReference`) or the source breaking.
pub struct ItemExtractor {
    clock: Clock,
}

impl ItemExtractor {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    pub fn extract<S: FeedSource + ?Sized>(
        &self,
        source: &mut S,
        feed: FeedHandle,
        element: ElementRef,
    ) -> Result<Item, SourceError> {
        let expandable = source
            .read_field(feed, element, FieldKey::ExpandControl)?
            .is_some_and(|v| v.is_visible());
        if expandable {
            source.expand(feed, element)?;
        }
        let mut read = |key: FieldKey| source.read_field(feed, element, key);

        let text = text_of(read(FieldKey::Text)?);
        let translated = read(FieldKey::TranslationMarker)?.is_some_and(|v| v.is_visible());
        let author_name = text_of(read(FieldKey::Author)?);
        let rating = parse::clamp_rating(read(FieldKey::RatingMarkers)?.map_or(0, |v| v.count()));
        let relative_time = text_of(read(FieldKey::RelativeTime)?);
        let is_trusted_contributor = read(FieldKey::TrustedBadge)?.is_some_and(|v| v.is_visible());
        let endorsements = read(FieldKey::EndorsementCount)?.and_then(FieldValue::into_text);
        let endorsement_count = parse::endorsement_count(endorsements.as_deref());
        let other_items_by_author = read(FieldKey::AuthorSubtitle)?
            .filter(FieldValue::is_visible)
            .and_then(FieldValue::into_text)
            .map_or(0, |subtitle| parse::leading_count(&subtitle));

        Ok(Item {
            id: element.id(),
            author_name,
            language: Language::infer(&text, translated),
            text,
            rating,
            relative_time,
            is_trusted_contributor,
            endorsement_count,
            other_items_by_author,
            harvested_at: (self.clock)(),
        })
    }
}

fn text_of(value: Option<FieldValue>) -> String {
    value.and_then(FieldValue::into_text).unwrap_or_default()
}
