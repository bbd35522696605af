use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::ParentRecord;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read records from {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("records document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("records document must be a JSON object keyed by record id")]
    NotAnObject,
}

/// Attributes of one parent record as delivered by the upstream detail fetch.
#[derive(Debug, Deserialize)]
struct RecordDocument {
    #[serde(default)]
    name: String,
    #[serde(default, alias = "feed_url")]
    url: Option<String>,
    #[serde(default, alias = "closed")]
    permanently_closed: Option<bool>,
    #[serde(default, alias = "expected_item_count")]
    user_ratings_total: Option<u32>,
    #[serde(default)]
    reviews: Option<serde_json::Value>,
    #[serde(default)]
    has_feed: Option<bool>,
    #[serde(default)]
    popular_times: Option<serde_json::Value>,
}

pub fn load_parent_records(path: &Path) -> Result<Vec<ParentRecord>, InputError> {
    let text = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_parent_records(&text)?;
    engine_info!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Parses the id → record mapping, sorted by id. Entries that are not JSON
/// objects (bookkeeping lists such as `fails`) are ignored.
pub fn parse_parent_records(text: &str) -> Result<Vec<ParentRecord>, InputError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Object(map) = value else {
        return Err(InputError::NotAnObject);
    };

    let mut records = Vec::with_capacity(map.len());
    for (id, entry) in map {
        if !entry.is_object() {
            engine_debug!("Ignoring non-record entry {:?}", id);
            continue;
        }
        let doc: RecordDocument = match serde_json::from_value(entry) {
            Ok(doc) => doc,
            Err(err) => {
                engine_warn!("Ignoring malformed record {:?}: {}", id, err);
                continue;
            }
        };
        let has_feed = doc
            .has_feed
            .unwrap_or(doc.reviews.is_some())
            && doc.url.is_some();
        records.push(ParentRecord {
            id,
            name: doc.name,
            feed_url: doc.url.unwrap_or_default(),
            expected_item_count: doc.user_ratings_total.unwrap_or(0),
            closed: doc.permanently_closed.unwrap_or(false),
            has_feed,
            popular_times: doc.popular_times,
        });
    }
    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}
