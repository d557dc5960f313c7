//! Operator command surface — authorization gate, command parsing, and the
//! per-conversation dialog state machine.

pub mod command;
pub mod engine;

pub use command::{Command, ListAction, ListKind};
pub use engine::{AdminEngine, DialogState};
