//! Durable address lists — one normalized address per line, sorted.
//!
//! Two instances back the allow-list and the deny-list. A missing file is an
//! empty list, never an error; every mutation is persisted before the caller
//! is told its outcome.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Outcome of an add operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Outcome of a remove operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Normalize an address for comparison and persistence.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A durable set of normalized email addresses backed by a plain-text file.
///
/// The mutex serializes read-modify-write cycles so concurrent operators
/// cannot lose updates through interleaved load/save pairs.
pub struct ListStore {
    path: PathBuf,
    entries: Mutex<BTreeSet<String>>,
}

impl ListStore {
    /// Open the list at `path`, loading existing entries.
    /// Read failures are logged and treated as an empty list (fail-open).
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("{e}; starting with an empty list");
                BTreeSet::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Add an address. On a failed file write the in-memory insert is rolled
    /// back, so a retry attempts the write again.
    pub async fn add(&self, raw: &str) -> Result<AddOutcome, StoreError> {
        let entry = normalize(raw);
        let mut entries = self.entries.lock().await;
        if !entries.insert(entry.clone()) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        if let Err(e) = self.persist(&entries).await {
            entries.remove(&entry);
            return Err(e);
        }
        Ok(AddOutcome::Added)
    }

    /// Remove an address. On a failed file write the in-memory removal is
    /// rolled back, so a retry attempts the write again.
    pub async fn remove(&self, raw: &str) -> Result<RemoveOutcome, StoreError> {
        let entry = normalize(raw);
        let mut entries = self.entries.lock().await;
        if !entries.remove(&entry) {
            return Ok(RemoveOutcome::NotFound);
        }
        if let Err(e) = self.persist(&entries).await {
            entries.insert(entry);
            return Err(e);
        }
        Ok(RemoveOutcome::Removed)
    }

    /// Remove every entry. On a failed file write the entries are restored.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let snapshot = std::mem::take(&mut *entries);
        if let Err(e) = self.persist(&entries).await {
            *entries = snapshot;
            return Err(e);
        }
        Ok(())
    }

    /// Current entries, sorted.
    pub async fn entries(&self) -> Vec<String> {
        self.entries.lock().await.iter().cloned().collect()
    }

    async fn persist(&self, entries: &BTreeSet<String>) -> Result<(), StoreError> {
        let mut out = entries
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        fs::write(&self.path, out)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Read and normalize entries from disk. Missing file is an empty set.
async fn read_entries(path: &Path) -> Result<BTreeSet<String>, StoreError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };
    Ok(raw
        .lines()
        .map(normalize)
        .filter(|line| !line.is_empty())
        .collect())
}
