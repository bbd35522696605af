use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by the feed source, the harvest loop and the run controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The feed or page failed to become ready.
    LoadError,
    /// The provider-declared item count is absent.
    NotFound,
    /// A bounded wait expired.
    TimedOut,
    /// An element reference is no longer part of the live window.
    StaleReference,
    /// Zero elements rendered on the first read: the provider denies access.
    FeedNotLoading,
    Unclassified,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::LoadError => write!(f, "load error"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::TimedOut => write!(f, "timed out"),
            ErrorKind::StaleReference => write!(f, "stale reference"),
            ErrorKind::FeedNotLoading => write!(f, "feed not loading"),
            ErrorKind::Unclassified => write!(f, "unclassified failure"),
        }
    }
}

/// What the run controller does with a record that ended in a given failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Record the interruption and continue with the next record.
    Skip,
    /// Write a checkpoint at this record and stop the run.
    Halt,
}

/// The single skip-vs-halt classification table.
pub fn classify(kind: ErrorKind) -> Disposition {
    match kind {
        ErrorKind::LoadError
        | ErrorKind::NotFound
        | ErrorKind::TimedOut
        | ErrorKind::StaleReference => Disposition::Skip,
        ErrorKind::FeedNotLoading | ErrorKind::Unclassified => Disposition::Halt,
    }
}
