use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use mailgram::admin::AdminEngine;
use mailgram::channels::{Messenger, TelegramChannel};
use mailgram::config::RelayConfig;
use mailgram::relay::RelayEngine;
use mailgram::store::{ListStore, QueueStore};

#[tokio::main]
async fn main() -> mailgram::error::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env()?;

    eprintln!("📬 mailgram v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Queue: {}", config.queue_file.display());
    eprintln!("   Attachments: {}", config.attachments_dir.display());
    eprintln!(
        "   Lists: {} / {}",
        config.whitelist_file.display(),
        config.blacklist_file.display()
    );
    eprintln!("   Operators: {}", config.admin_ids.join(", "));
    if config.drain_interval_secs > 0 {
        eprintln!("   Drain: every {}s", config.drain_interval_secs);
    } else {
        eprintln!("   Drain: disabled");
    }

    let channel = Arc::new(TelegramChannel::new(
        config.bot_token,
        Duration::from_secs(config.send_timeout_secs),
    )?);
    channel.health_check().await?;

    let whitelist = ListStore::open(&config.whitelist_file).await;
    let blacklist = ListStore::open(&config.blacklist_file).await;
    let admins: HashSet<String> = config.admin_ids.iter().cloned().collect();
    let engine = AdminEngine::new(admins, whitelist, blacklist, config.strict_persistence);

    let relay = Arc::new(RelayEngine::new(
        QueueStore::new(&config.queue_file),
        config.attachments_dir.clone(),
        Arc::clone(&channel) as Arc<dyn Messenger>,
        config.chat_id.clone(),
    ));

    // Scheduled drain passes; the engine's internal lock keeps them from
    // overlapping with any on-demand invocation.
    if config.drain_interval_secs > 0 {
        let relay = Arc::clone(&relay);
        let interval = Duration::from_secs(config.drain_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match relay.drain().await {
                    Ok(report) if report.delivered + report.retained > 0 => {
                        tracing::info!(?report, "Drain pass finished");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Drain pass failed: {e}"),
                }
            }
        });
    }

    // Single consumer: handling updates sequentially keeps each
    // conversation's dialog transitions serialized.
    let mut updates = channel.updates();
    while let Some(update) = updates.next().await {
        let reply = engine
            .handle(&update.chat_id, &update.sender_id, &update.text)
            .await;
        if let Err(e) = channel.send_text(&update.chat_id, &reply).await {
            tracing::error!(chat = %update.chat_id, "Failed to send reply: {e}");
        }
    }

    Ok(())
}
