//! Identity record stores.
//!
//! The flow needs two operations: find by composite key and upsert one
//! record. `JsonFileStore` is the production implementation — a small JSON
//! array loaded once, served from memory, and rewritten atomically on every
//! upsert. `MemoryStore` backs tests.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{FlowError, FlowResult};

use super::record::{IdentityRecord, RecordKey};

/// Read/upsert contract the verifier consumes.
pub trait IdentityStore: Send + Sync {
    /// First record matching the key, if any.
    fn find(&self, key: &RecordKey) -> FlowResult<Option<IdentityRecord>>;

    /// Replace the first record with the same key, or append.
    fn upsert(&self, record: IdentityRecord) -> FlowResult<()>;

    /// Number of enrolled records.
    fn len(&self) -> FlowResult<usize>;

    fn is_empty(&self) -> FlowResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// JSON-file-backed store.
pub struct JsonFileStore {
    records: RwLock<Vec<IdentityRecord>>,
    path: PathBuf,
}

impl JsonFileStore {
    /// Load the store, recovering from the backup file if the primary is
    /// corrupted. A missing file is an empty store; the file appears on the
    /// first upsert.
    pub fn open(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref().to_path_buf();
        let backup_path = path.with_extension("json.backup");

        let records = match Self::read_records(&path) {
            Ok(records) => records,
            Err(FlowError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Record store corrupted, trying backup"
                );
                match Self::read_records(&backup_path) {
                    Ok(records) => {
                        tracing::warn!(
                            backup = %backup_path.display(),
                            count = records.len(),
                            "Recovered record store from backup"
                        );
                        records
                    }
                    Err(backup_err) => {
                        return Err(FlowError::store(format!(
                            "record store unreadable ({e}) and backup unreadable ({backup_err})"
                        )))
                    }
                }
            }
        };

        tracing::info!(path = %path.display(), count = records.len(), "Record store loaded");
        Ok(Self {
            records: RwLock::new(records),
            path,
        })
    }

    fn read_records(path: &Path) -> FlowResult<Vec<IdentityRecord>> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<IdentityRecord> = serde_json::from_str(&content)?;
        Ok(records)
    }

    /// Write the collection atomically: backup the current file best-effort,
    /// write a temp file, rename over the original.
    fn save(&self, records: &[IdentityRecord]) -> FlowResult<()> {
        let backup_path = self.path.with_extension("json.backup");
        let temp_path = self.path.with_extension("json.tmp");

        if self.path.exists() {
            if let Err(e) = std::fs::copy(&self.path, &backup_path) {
                tracing::warn!(error = %e, "Failed to back up record store");
            }
        }

        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl IdentityStore for JsonFileStore {
    fn find(&self, key: &RecordKey) -> FlowResult<Option<IdentityRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| FlowError::store("record lock poisoned"))?;
        Ok(records.iter().find(|r| r.matches(key)).cloned())
    }

    fn upsert(&self, record: IdentityRecord) -> FlowResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| FlowError::store("record lock poisoned"))?;

        let key = record.key();
        match records.iter_mut().find(|r| r.matches(&key)) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        self.save(&records)
    }

    fn len(&self) -> FlowResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| FlowError::store("record lock poisoned"))?;
        Ok(records.len())
    }
}

/// In-memory store for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<IdentityRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<IdentityRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl IdentityStore for MemoryStore {
    fn find(&self, key: &RecordKey) -> FlowResult<Option<IdentityRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| FlowError::store("record lock poisoned"))?;
        Ok(records.iter().find(|r| r.matches(key)).cloned())
    }

    fn upsert(&self, record: IdentityRecord) -> FlowResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| FlowError::store("record lock poisoned"))?;

        let key = record.key();
        match records.iter_mut().find(|r| r.matches(&key)) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    fn len(&self) -> FlowResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| FlowError::store("record lock poisoned"))?;
        Ok(records.len())
    }
}
