use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ErrorKind, StopReason};

pub type RecordId = String;

/// Feed-assigned element id. Ids grow monotonically in feed order, gaps allowed.
pub type ItemId = u64;

/// A parent record whose item feed is harvested. Supplied by the input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    pub feed_url: String,
    #[serde(default)]
    pub expected_item_count: u32,
    #[serde(default)]
    pub closed: bool,
    #[serde(default = "default_has_feed")]
    pub has_feed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popular_times: Option<serde_json::Value>,
}

fn default_has_feed() -> bool {
    true
}

impl ParentRecord {
    /// Closed records and records without a feed are recorded but never opened.
    pub fn is_harvestable(&self) -> bool {
        !self.closed && self.has_feed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    InferredSame,
    InferredOther,
    Unknown,
}

impl Language {
    /// Empty text carries no language; a translation marker means the
    /// provider rendered a translation of another language.
    pub fn infer(text: &str, translated: bool) -> Self {
        if text.trim().is_empty() {
            Language::Unknown
        } else if translated {
            Language::InferredOther
        } else {
            Language::InferredSame
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub author_name: String,
    pub text: String,
    pub language: Language,
    pub rating: u8,
    pub relative_time: String,
    pub is_trusted_contributor: bool,
    #[serde(default)]
    pub endorsement_count: u32,
    #[serde(default)]
    pub other_items_by_author: u32,
    pub harvested_at: DateTime<Utc>,
}

impl Item {
    pub fn has_comment(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Why a record's harvest ended early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interruption {
    pub record_id: RecordId,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    pub record: ParentRecord,
    pub declared_count: u32,
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popular_times: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interruption: Option<Interruption>,
}

impl HarvestResult {
    /// Result for a record that is processed without opening its feed.
    pub fn empty(record: ParentRecord) -> Self {
        let popular_times = record.popular_times.clone();
        Self {
            record,
            declared_count: 0,
            items: Vec::new(),
            popular_times,
            stop_reason: None,
            interruption: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

/// Single persisted resume marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub key: RecordId,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<Interruption> for Checkpoint {
    fn from(interruption: Interruption) -> Self {
        Self {
            key: interruption.record_id,
            error_kind: interruption.kind,
            message: interruption.message,
        }
    }
}
