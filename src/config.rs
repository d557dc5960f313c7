//! Configuration, built from environment variables.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Relay configuration.
#[derive(Debug)]
pub struct RelayConfig {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// Chat that receives relayed emails.
    pub chat_id: String,
    /// Operator identities allowed to issue admin commands.
    pub admin_ids: Vec<String>,
    /// Queue Store file (JSON array of email records).
    pub queue_file: PathBuf,
    /// Directory holding attachment files referenced by the queue.
    pub attachments_dir: PathBuf,
    /// Allow-list file (one address per line).
    pub whitelist_file: PathBuf,
    /// Deny-list file (one address per line).
    pub blacklist_file: PathBuf,
    /// Seconds between scheduled drain passes (0 disables the ticker).
    pub drain_interval_secs: u64,
    /// Per-request timeout for every endpoint send.
    pub send_timeout_secs: u64,
    /// When set, list-save failures are reported to the operator instead of
    /// being logged and presented as success.
    pub strict_persistence: bool,
}

impl RelayConfig {
    /// Build config from environment variables.
    /// Fails fast if the bot token, target chat, or operator list is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("MAILGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("MAILGRAM_BOT_TOKEN".into()))?;

        let chat_id = std::env::var("MAILGRAM_CHAT_ID")
            .map_err(|_| ConfigError::MissingEnvVar("MAILGRAM_CHAT_ID".into()))?;

        let admin_ids = parse_ids(
            &std::env::var("MAILGRAM_ADMIN_IDS")
                .map_err(|_| ConfigError::MissingEnvVar("MAILGRAM_ADMIN_IDS".into()))?,
        );
        if admin_ids.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "MAILGRAM_ADMIN_IDS".into(),
                message: "at least one operator id is required".into(),
            });
        }

        let queue_file = env_path("MAILGRAM_QUEUE_FILE", "emails.json");
        let attachments_dir = env_path("MAILGRAM_ATTACHMENTS_DIR", "attachments");
        let whitelist_file = env_path("MAILGRAM_WHITELIST_FILE", "whitelist.txt");
        let blacklist_file = env_path("MAILGRAM_BLACKLIST_FILE", "blacklist.txt");

        let drain_interval_secs = env_u64("MAILGRAM_DRAIN_INTERVAL_SECS", 60);
        let send_timeout_secs = env_u64("MAILGRAM_SEND_TIMEOUT_SECS", 30);

        let strict_persistence = parse_bool(
            std::env::var("MAILGRAM_STRICT_PERSISTENCE").ok().as_deref(),
            true,
        );

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            chat_id,
            admin_ids,
            queue_file,
            attachments_dir,
            whitelist_file,
            blacklist_file,
            drain_interval_secs,
            send_timeout_secs,
            strict_persistence,
        })
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated list of identities, dropping blanks.
fn parse_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_splits_and_trims() {
        assert_eq!(
            parse_ids("123, 456 ,789"),
            vec!["123".to_string(), "456".to_string(), "789".to_string()]
        );
    }

    #[test]
    fn parse_ids_drops_blank_entries() {
        assert_eq!(parse_ids(",, 42 ,"), vec!["42".to_string()]);
        assert!(parse_ids("").is_empty());
    }

    #[test]
    fn parse_bool_recognizes_common_forms() {
        assert!(!parse_bool(Some("false"), true));
        assert!(!parse_bool(Some("0"), true));
        assert!(parse_bool(Some("true"), false));
        assert!(parse_bool(Some("on"), false));
    }

    #[test]
    fn parse_bool_falls_back_to_default() {
        assert!(parse_bool(None, true));
        assert!(!parse_bool(Some("maybe"), false));
    }
}
