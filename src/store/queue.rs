//! Pending email queue — a JSON document array rewritten after each drain.
//!
//! The queue file is shared with the external ingestion process that appends
//! new records; the relay only ever rewrites it with the records that still
//! need delivery. The rewrite goes through a temp file and rename so a crash
//! mid-write never leaves a half-written queue behind.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::StoreError;

/// A reference to an attachment file in the shared attachment directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub filename: String,
}

/// One ingested email awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

/// File-backed queue of pending email records.
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load all pending records. A missing, unreadable, or unparsable file
    /// is an empty queue (fail-open); the failure is logged.
    pub async fn load(&self) -> Vec<EmailRecord> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}", self.path.display());
                return Vec::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {e}", self.path.display());
                Vec::new()
            }
        }
    }

    /// Rewrite the queue with exactly `records`, atomically.
    pub async fn save(&self, records: &[EmailRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };
        fs::write(&tmp, json).await.map_err(write_err)?;
        fs::rename(&tmp, &self.path).await.map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str) -> EmailRecord {
        EmailRecord {
            from: "sender@example.com".into(),
            to: "inbox@example.com".into(),
            date: "2026-08-27T10:00:00Z".into(),
            subject: subject.into(),
            content: "hello".into(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("emails.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("emails.json"));

        let records = vec![record("first"), record("second")];
        store.save(&records).await.unwrap();

        assert_eq!(store.load().await, records);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emails.json");
        let store = QueueStore::new(&path);

        store.save(&[record("only")]).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("emails.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_attachments_field_defaults_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emails.json");
        std::fs::write(
            &path,
            r#"[{"from":"a@b.c","to":"d@e.f","date":"today","subject":"s","content":"body"}]"#,
        )
        .unwrap();

        let records = QueueStore::new(&path).load().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emails.json");
        std::fs::write(&path, "not json at all").unwrap();

        assert!(QueueStore::new(&path).load().await.is_empty());
        // the corrupt file is left on disk, not clobbered
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json at all");
    }

    #[tokio::test]
    async fn attachment_refs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("emails.json"));

        let mut rec = record("with attachment");
        rec.attachments = vec![AttachmentRef {
            filename: "1693000000_invoice.pdf".into(),
        }];
        store.save(std::slice::from_ref(&rec)).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded[0].attachments[0].filename, "1693000000_invoice.pdf");
    }
}
