//! Admin command vocabulary and reply templates.

/// Which control list a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Whitelist,
    Blacklist,
}

impl ListKind {
    /// Lowercase name used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
        }
    }

    /// Capitalized name used at the start of replies.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Whitelist => "Whitelist",
            Self::Blacklist => "Blacklist",
        }
    }
}

/// Mutation awaiting its address argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Add,
    Remove,
}

/// A recognized top-level command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    Add(ListKind),
    Remove(ListKind),
    List(ListKind),
    Clear(ListKind),
}

impl Command {
    /// Parse the first whitespace token of a message.
    /// A trailing `@BotName` suffix (Telegram group convention) is accepted.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.trim().split_whitespace().next()?;
        let token = token.split('@').next().unwrap_or(token);
        match token {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/cancel" => Some(Self::Cancel),
            "/addemail" => Some(Self::Add(ListKind::Whitelist)),
            "/removeemail" => Some(Self::Remove(ListKind::Whitelist)),
            "/listemails" => Some(Self::List(ListKind::Whitelist)),
            "/clearwhitelist" => Some(Self::Clear(ListKind::Whitelist)),
            "/addblacklist" => Some(Self::Add(ListKind::Blacklist)),
            "/removeblacklist" => Some(Self::Remove(ListKind::Blacklist)),
            "/listblacklist" => Some(Self::List(ListKind::Blacklist)),
            "/clearblacklist" => Some(Self::Clear(ListKind::Blacklist)),
            _ => None,
        }
    }
}

// ── Fixed reply templates ───────────────────────────────────────────

pub const DENIED_TEXT: &str =
    "🚫 Access Denied. You are not authorized to interact with this bot.";

pub const UNKNOWN_TEXT: &str =
    "🤔 Unknown command or text. Use /help to see available admin commands.";

pub const CANCELLED_TEXT: &str = "✅ Any active command has been cancelled.";

pub const START_TEXT: &str = "👋 Welcome, Admin! This bot manages email whitelists and blacklists.\n\
     Use /help to see available commands.\n\
     Use /cancel to stop any ongoing operation.";

pub const HELP_TEXT: &str = "🛠️ *Available Admin Commands:*\n\n\
     *General:*\n\
     /cancel - Cancel the current operation\n\n\
     *Whitelist (Allow Recipient):*\n\
     /addemail - Add to whitelist\n\
     /removeemail - Remove from whitelist\n\
     /listemails - View whitelist\n\
     /clearwhitelist - Clear whitelist\n\n\
     *Blacklist (Block Sender):*\n\
     /addblacklist - Add to blacklist\n\
     /removeblacklist - Remove from blacklist\n\
     /listblacklist - View blacklist\n\
     /clearblacklist - Clear blacklist";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/cancel"), Some(Command::Cancel));
        assert_eq!(
            Command::parse("/addemail"),
            Some(Command::Add(ListKind::Whitelist))
        );
        assert_eq!(
            Command::parse("/removeemail"),
            Some(Command::Remove(ListKind::Whitelist))
        );
        assert_eq!(
            Command::parse("/listemails"),
            Some(Command::List(ListKind::Whitelist))
        );
        assert_eq!(
            Command::parse("/clearwhitelist"),
            Some(Command::Clear(ListKind::Whitelist))
        );
        assert_eq!(
            Command::parse("/addblacklist"),
            Some(Command::Add(ListKind::Blacklist))
        );
        assert_eq!(
            Command::parse("/removeblacklist"),
            Some(Command::Remove(ListKind::Blacklist))
        );
        assert_eq!(
            Command::parse("/listblacklist"),
            Some(Command::List(ListKind::Blacklist))
        );
        assert_eq!(
            Command::parse("/clearblacklist"),
            Some(Command::Clear(ListKind::Blacklist))
        );
    }

    #[test]
    fn accepts_bot_name_suffix() {
        assert_eq!(
            Command::parse("/addemail@MailgramBot"),
            Some(Command::Add(ListKind::Whitelist))
        );
    }

    #[test]
    fn ignores_inline_arguments() {
        assert_eq!(
            Command::parse("/listemails please"),
            Some(Command::List(ListKind::Whitelist))
        );
    }

    #[test]
    fn rejects_non_commands() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("foo@bar.com"), None);
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   "), None);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(Command::parse("  /cancel  "), Some(Command::Cancel));
    }
}
