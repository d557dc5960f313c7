//! Conversational admin engine.
//!
//! Every message passes the authorization gate first; a non-operator gets
//! exactly the fixed denial reply and nothing else happens — no dialog state
//! is read or written, no list is touched. For operators, the engine keeps
//! one dialog state per conversation and resolves it to `Idle` before any
//! new continuation is registered, so stale continuations can never fire.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::admin::command::{
    CANCELLED_TEXT, Command, DENIED_TEXT, HELP_TEXT, ListAction, ListKind, START_TEXT,
    UNKNOWN_TEXT,
};
use crate::error::StoreError;
use crate::store::{AddOutcome, ListStore, RemoveOutcome, normalize};

/// Dialog state of one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    /// An add/remove command was issued; the next message is the address.
    AwaitingArgument { action: ListAction, list: ListKind },
    /// A clear command was issued; the next message must be literal `YES`.
    AwaitingConfirmation { list: ListKind },
}

/// Gate, dialog state machine, and list mutations for operator commands.
pub struct AdminEngine {
    admins: HashSet<String>,
    whitelist: ListStore,
    blacklist: ListStore,
    dialogs: Mutex<HashMap<String, DialogState>>,
    strict_persistence: bool,
}

impl AdminEngine {
    pub fn new(
        admins: HashSet<String>,
        whitelist: ListStore,
        blacklist: ListStore,
        strict_persistence: bool,
    ) -> Self {
        Self {
            admins,
            whitelist,
            blacklist,
            dialogs: Mutex::new(HashMap::new()),
            strict_persistence,
        }
    }

    /// Authorization gate: pure lookup against the static operator set.
    pub fn is_operator(&self, sender_id: &str) -> bool {
        self.admins.contains(sender_id)
    }

    /// Handle one inbound message and produce the single reply for it.
    pub async fn handle(&self, chat_id: &str, sender_id: &str, text: &str) -> String {
        if !self.is_operator(sender_id) {
            return DENIED_TEXT.to_string();
        }

        let state = self.state(chat_id).await;
        let trimmed = text.trim();

        if state != DialogState::Idle {
            // A recognized command replaces any pending continuation;
            // /cancel in particular is checked before the argument is consumed.
            if let Some(cmd) = Command::parse(trimmed) {
                self.set_state(chat_id, DialogState::Idle).await;
                return self.run_command(chat_id, cmd).await;
            }
        }

        match state {
            DialogState::Idle => match Command::parse(trimmed) {
                Some(cmd) => self.run_command(chat_id, cmd).await,
                None => UNKNOWN_TEXT.to_string(),
            },
            DialogState::AwaitingArgument { action, list } => {
                self.set_state(chat_id, DialogState::Idle).await;
                if trimmed.is_empty() {
                    return "⚠️ No email address given. Run the command again and reply \
                            with a single address."
                        .to_string();
                }
                self.apply_mutation(action, list, trimmed).await
            }
            DialogState::AwaitingConfirmation { list } => {
                self.set_state(chat_id, DialogState::Idle).await;
                if trimmed.eq_ignore_ascii_case("yes") {
                    self.clear_list(list).await
                } else {
                    format!("❌ Cancelled. {} not modified.", list.title())
                }
            }
        }
    }

    async fn run_command(&self, chat_id: &str, cmd: Command) -> String {
        match cmd {
            Command::Start => START_TEXT.to_string(),
            Command::Help => HELP_TEXT.to_string(),
            Command::Cancel => {
                self.set_state(chat_id, DialogState::Idle).await;
                CANCELLED_TEXT.to_string()
            }
            Command::Add(list) => {
                self.set_state(
                    chat_id,
                    DialogState::AwaitingArgument {
                        action: ListAction::Add,
                        list,
                    },
                )
                .await;
                format!(
                    "✉️ Please enter the email to *add* to the *{}* (or /cancel):",
                    list.label()
                )
            }
            Command::Remove(list) => {
                self.set_state(
                    chat_id,
                    DialogState::AwaitingArgument {
                        action: ListAction::Remove,
                        list,
                    },
                )
                .await;
                format!(
                    "✉️ Please enter the email to *remove* from the *{}* (or /cancel):",
                    list.label()
                )
            }
            Command::List(list) => {
                let entries = self.store(list).entries().await;
                if entries.is_empty() {
                    format!("⚠️ {} is empty.", list.title())
                } else {
                    let lines: Vec<String> =
                        entries.iter().map(|e| format!("`{e}`")).collect();
                    format!("*📜 {} emails:*\n{}", list.title(), lines.join("\n"))
                }
            }
            Command::Clear(list) => {
                self.set_state(chat_id, DialogState::AwaitingConfirmation { list })
                    .await;
                format!(
                    "⚠️ Are you *sure* you want to clear the *{}*? Reply `YES` to confirm (or /cancel).",
                    list.label()
                )
            }
        }
    }

    async fn apply_mutation(&self, action: ListAction, list: ListKind, raw: &str) -> String {
        let entry = normalize(raw);
        let store = self.store(list);
        match action {
            ListAction::Add => {
                let ok = format!("✅ Added to {}: `{entry}`", list.label());
                match store.add(raw).await {
                    Ok(AddOutcome::Added) => ok,
                    Ok(AddOutcome::AlreadyPresent) => {
                        format!("⚠️ `{entry}` already in the {}.", list.label())
                    }
                    Err(e) => self.persist_failed(e, ok),
                }
            }
            ListAction::Remove => {
                let ok = format!("✅ Removed from {}: `{entry}`", list.label());
                match store.remove(raw).await {
                    Ok(RemoveOutcome::Removed) => ok,
                    Ok(RemoveOutcome::NotFound) => {
                        format!("⚠️ `{entry}` not found in {}.", list.label())
                    }
                    Err(e) => self.persist_failed(e, ok),
                }
            }
        }
    }

    async fn clear_list(&self, list: ListKind) -> String {
        let ok = format!("✅ {} cleared.", list.title());
        match self.store(list).clear().await {
            Ok(()) => ok,
            Err(e) => self.persist_failed(e, ok),
        }
    }

    /// Persistence-failure policy: strict mode tells the operator the truth,
    /// lenient mode keeps the original bot's silent-success behavior.
    fn persist_failed(&self, e: StoreError, lenient_reply: String) -> String {
        tracing::error!("List persistence failed: {e}");
        if self.strict_persistence {
            "🚫 The change could not be saved to disk and was not applied. Try again."
                .to_string()
        } else {
            lenient_reply
        }
    }

    fn store(&self, list: ListKind) -> &ListStore {
        match list {
            ListKind::Whitelist => &self.whitelist,
            ListKind::Blacklist => &self.blacklist,
        }
    }

    async fn state(&self, chat_id: &str) -> DialogState {
        self.dialogs
            .lock()
            .await
            .get(chat_id)
            .copied()
            .unwrap_or(DialogState::Idle)
    }

    async fn set_state(&self, chat_id: &str, state: DialogState) {
        let mut dialogs = self.dialogs.lock().await;
        if state == DialogState::Idle {
            dialogs.remove(chat_id);
        } else {
            dialogs.insert(chat_id.to_string(), state);
        }
    }
}
