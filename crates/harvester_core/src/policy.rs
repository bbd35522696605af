use serde::{Deserialize, Serialize};

use crate::{Item, Language};

/// Inclusion predicate of the stop heuristic.
///
/// The provider sorts a feed by relevance: same-language items with a
/// comment first, then other-language items, then comment-less ones. The
/// first item that fails the predicate therefore ends the harvest; nothing
/// after it can pass. This is a best-effort optimization tied to that
/// ordering, not a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InclusionPolicy {
    #[serde(default)]
    pub same_language_only: bool,
    #[serde(default)]
    pub comments_only: bool,
}

impl InclusionPolicy {
    pub fn admits(&self, item: &Item) -> bool {
        if self.same_language_only && item.language != Language::InferredSame {
            return false;
        }
        if self.comments_only && !item.has_comment() {
            return false;
        }
        true
    }
}
