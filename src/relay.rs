//! Relay engine — drains the pending email queue to the messaging endpoint.
//!
//! Delivery is at-least-once: a record whose summary send fails stays queued
//! for the next pass, and nothing about it is touched. Once the summary is
//! through, attachments are forwarded best-effort — each success deletes the
//! file, each failure is logged and skipped, and the record is still dropped
//! from the queue.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::channels::Messenger;
use crate::error::Result;
use crate::store::{EmailRecord, QueueStore};

/// Body text is clipped to this many characters before sending.
const MAX_BODY_CHARS: usize = 2000;

/// What one drain pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Records whose summary was delivered (dropped from the queue).
    pub delivered: usize,
    /// Records retained for the next pass.
    pub retained: usize,
    /// Attachments sent and deleted from disk.
    pub attachments_sent: usize,
    /// Attachments that failed to send (orphaned on disk).
    pub attachments_failed: usize,
}

/// Drains the queue store to a chat endpoint, one pass at a time.
pub struct RelayEngine {
    queue: QueueStore,
    attachments_dir: PathBuf,
    messenger: Arc<dyn Messenger>,
    chat_id: String,
    // No two drain passes may overlap against the same queue.
    drain_lock: Mutex<()>,
}

impl RelayEngine {
    pub fn new(
        queue: QueueStore,
        attachments_dir: impl Into<PathBuf>,
        messenger: Arc<dyn Messenger>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            attachments_dir: attachments_dir.into(),
            messenger,
            chat_id: chat_id.into(),
            drain_lock: Mutex::new(()),
        }
    }

    /// Run one drain pass: deliver every queued record, then rewrite the
    /// queue with exactly the records whose summary send failed.
    pub async fn drain(&self) -> Result<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        let records = self.queue.load().await;
        if records.is_empty() {
            tracing::debug!("Queue empty, nothing to relay");
            return Ok(DrainReport::default());
        }

        let mut report = DrainReport::default();
        let mut retained = Vec::new();

        for record in records {
            let summary = format_summary(&record);
            match self.messenger.send_text(&self.chat_id, &summary).await {
                Ok(()) => {
                    report.delivered += 1;
                    self.forward_attachments(&record, &mut report).await;
                }
                Err(e) => {
                    tracing::warn!(
                        from = %record.from,
                        subject = %record.subject,
                        "Summary send failed, record retained: {e}"
                    );
                    retained.push(record);
                }
            }
        }

        report.retained = retained.len();
        self.queue.save(&retained).await?;

        Ok(report)
    }

    /// Forward each attachment of an already-summarized record.
    /// Per-attachment failures never block siblings or re-queue the record.
    async fn forward_attachments(&self, record: &EmailRecord, report: &mut DrainReport) {
        for att in &record.attachments {
            let path = self.attachments_dir.join(&att.filename);

            if !fs::try_exists(&path).await.unwrap_or(false) {
                tracing::warn!("Attachment missing on disk, skipped: {}", path.display());
                continue;
            }

            let caption = format!("📎 {}", att.filename);
            match self
                .messenger
                .send_document(&self.chat_id, &path, Some(&caption))
                .await
            {
                Ok(()) => {
                    if let Err(e) = fs::remove_file(&path).await {
                        tracing::warn!("Sent but could not delete {}: {e}", path.display());
                    }
                    report.attachments_sent += 1;
                    tracing::info!("Sent and deleted attachment: {}", att.filename);
                }
                Err(e) => {
                    report.attachments_failed += 1;
                    tracing::warn!("Failed to send attachment {}: {e}", att.filename);
                }
            }
        }
    }
}

/// Format the one-message summary of an email record.
fn format_summary(record: &EmailRecord) -> String {
    format!(
        "📧 *New Email Received!*\n\
         🟢 *From*    : `{}`\n\
         🔵 *To*      : `{}`\n\
         📅 *Date*    : `{}`\n\
         ✉️ *Subject* : *{}*\n\
         \n📄 *Body:*\n```\n{}\n```",
        record.from,
        record.to,
        record.date,
        record.subject,
        truncate_chars(record.content.trim(), MAX_BODY_CHARS),
    )
}

/// Clip to at most `max` characters, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
