//! Messaging endpoint abstraction and the Telegram transport.

pub mod messenger;
pub mod telegram;

pub use messenger::{IncomingUpdate, Messenger, UpdateStream};
pub use telegram::TelegramChannel;
