//! JSON state-file adapter.
//!
//! Implements [`FeedStore`] on a single JSON document.
//!
//! # Durability
//!
//! - Atomic replace: every write goes to a temp file in the same
//!   directory, is fsynced, then renamed over the record.  Readers see the
//!   old or the new document, never a truncated one.
//! - Scoped access: the file is opened per call and closed before
//!   returning; no handle outlives an operation.
//! - Corruption: a record that does not parse, or whose counters do not
//!   add up, is moved aside to `<path>.corrupt` on the next write so the
//!   evidence survives and counting restarts from zero.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::app::ports::{FeedStore, StoredState};
use crate::error::StorageError;
use crate::state::{FeedOutcome, FeedState};

pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt record is moved.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn write(&self, state: &FeedState) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        debug!("State written to {}", self.path.display());
        Ok(())
    }

    fn quarantine(&self) {
        let target = self.corrupt_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => warn!(
                "Corrupt state moved to {}, counting restarts from zero",
                target.display()
            ),
            Err(e) => warn!("Could not move corrupt state aside: {}", e),
        }
    }
}

/// Decode a state document.  Counters that do not add up are corruption.
pub fn decode_state(bytes: &[u8]) -> Result<FeedState, String> {
    let state: FeedState = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    if !state.is_consistent() {
        return Err(format!(
            "counters inconsistent: total={} success={} failure={}",
            state.total_count, state.success_count, state.failure_count
        ));
    }
    Ok(state)
}

impl FeedStore for JsonStateStore {
    fn read(&self) -> Result<StoredState, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredState::Absent),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        decode_state(&bytes)
            .map(StoredState::Present)
            .map_err(|cause| StorageError::Corrupt {
                path: self.path.clone(),
                cause,
            })
    }

    fn record(
        &mut self,
        outcome: FeedOutcome,
        at: NaiveDateTime,
        next_scheduled_at: Option<NaiveDateTime>,
        error: Option<String>,
    ) -> Result<FeedState, StorageError> {
        let mut state = match self.load() {
            Ok(state) => state,
            Err(e) if e.is_corrupt() => {
                warn!("{}", e);
                self.quarantine();
                FeedState::default()
            }
            Err(e) => return Err(e),
        };
        state.apply(outcome, at, next_scheduled_at, error);
        self.write(&state)?;
        Ok(state)
    }

    fn seed(&mut self, state: &FeedState) -> Result<(), StorageError> {
        self.write(state)
    }
}
