//! mailgram — relays ingested email to Telegram and lets operators manage
//! allow/deny lists through a conversational command interface.

pub mod admin;
pub mod channels;
pub mod config;
pub mod error;
pub mod relay;
pub mod store;
