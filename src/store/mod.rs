//! Persistence layer — file-backed stores for control lists and the email queue.

pub mod list;
pub mod queue;

pub use list::{AddOutcome, ListStore, RemoveOutcome, normalize};
pub use queue::{AttachmentRef, EmailRecord, QueueStore};
