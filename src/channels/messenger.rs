//! The seam between the relay core and the chat transport.
//!
//! The relay engine and the admin engine only ever talk to a `Messenger`,
//! so both can be exercised in tests without a live endpoint.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// One inbound message from the chat transport.
#[derive(Debug, Clone)]
pub struct IncomingUpdate {
    /// Conversation the message arrived in (reply target).
    pub chat_id: String,
    /// Identity of the sender, checked against the operator list.
    pub sender_id: String,
    /// Message text.
    pub text: String,
}

/// Stream of inbound messages.
pub type UpdateStream = Pin<Box<dyn Stream<Item = IncomingUpdate> + Send>>;

/// Outbound operations the relay needs from a chat endpoint.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message to a chat.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Send a file as a document, with an optional caption.
    async fn send_document(
        &self,
        chat_id: &str,
        file_path: &Path,
        caption: Option<&str>,
    ) -> Result<(), ChannelError>;
}
