//! Progress storage (`.golings/progress.json`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::types::ProgressRecord;
use crate::error::StorageError;

/// Persists the set of completed exercises across runs.
///
/// Single writer (the watch loop or a one-shot command), any number of
/// readers. Writes go through a temp file and a rename, so a reader sees
/// either the previous or the new record, never a partial one.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record, distinguishing "absent" (`Ok(None)`) from failures.
    pub fn read(&self) -> Result<Option<ProgressRecord>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let record = serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(record))
    }

    /// Load progress, failing open.
    ///
    /// A missing file is a fresh start. An unreadable or corrupt file is
    /// logged and also yields an empty record, so the first run always works.
    pub fn load(&self) -> ProgressRecord {
        match self.read() {
            Ok(Some(record)) => {
                debug!(
                    path = %self.path.display(),
                    completed = record.completed.len(),
                    "progress loaded"
                );
                record
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "no progress yet, starting fresh");
                ProgressRecord::default()
            }
            Err(err) => {
                warn!(%err, "ignoring unusable progress file, starting fresh");
                ProgressRecord::default()
            }
        }
    }

    /// Atomically write the record (temp file + rename).
    ///
    /// Serialization is deterministic, so saving the same record twice yields
    /// identical bytes.
    pub fn save(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        debug!(
            path = %self.path.display(),
            completed = record.completed.len(),
            current = ?record.current,
            "writing progress"
        );
        let mut buf = serde_json::to_string_pretty(record)?;
        buf.push('\n');
        self.write_atomic(&buf)
    }

    fn write_atomic(&self, contents: &str) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}
