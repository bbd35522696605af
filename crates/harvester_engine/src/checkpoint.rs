use std::fs;
use std::io;
use std::path::PathBuf;

use engine_logging::{engine_info, engine_warn};
use harvester_core::{Checkpoint, ErrorKind};
use thiserror::Error;

use crate::persist::{parent_dir, AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to write checkpoint: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to read checkpoint {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed checkpoint {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("checkpoint path {0:?} has no file name")]
    InvalidPath(PathBuf),
}

/// Owns the single resume marker of a run.
///
/// The marker is written only when a run halts and is consumed exactly once
/// at the start of the next run: after a successful read it is deleted, and
/// this manager reports `None` from then on even if deletion failed.
#[derive(Debug)]
pub struct CheckpointManager {
    path: PathBuf,
    consumed: bool,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            consumed: false,
        }
    }

    pub fn write_checkpoint(
        &self,
        record_id: &str,
        kind: ErrorKind,
        message: &str,
    ) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = Checkpoint {
            key: record_id.to_string(),
            error_kind: kind,
            message: message.to_string(),
        };
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CheckpointError::InvalidPath(self.path.clone()))?;
        let content = serde_json::to_string_pretty(&checkpoint).map_err(PersistError::from)?;

        AtomicFileWriter::new(parent_dir(&self.path)).write(filename, &content)?;
        engine_info!("Checkpoint written at {} ({})", record_id, kind);
        Ok(checkpoint)
    }

    pub fn read_and_clear_checkpoint(&mut self) -> Result<Option<Checkpoint>, CheckpointError> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|source| CheckpointError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        if let Err(err) = fs::remove_file(&self.path) {
            engine_warn!("Could not remove consumed checkpoint {:?}: {}", self.path, err);
        }
        Ok(Some(checkpoint))
    }
}
