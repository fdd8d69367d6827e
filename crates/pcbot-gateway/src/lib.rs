//! pcbot-gateway: wires chat channels to the timer registry.
//!
//! Provides:
//! - Channel plugin framework for chat platform integrations
//! - Command parsing and reply texts
//! - Per-owner routing of commands and duration input
//! - Timer notifications through the originating channel

pub mod channel;
pub mod command;
pub mod messages;
pub mod notifier;
pub mod router;

use std::sync::Arc;

use tracing::info;

use pcbot_config::PcBotConfig;
use pcbot_timer::{ActionInvoker, TimerRegistry};

use channel::{ChannelManager, ChannelPlugin};
use notifier::ChannelNotifier;
use router::CommandRouter;

/// Build the router for a channel manager: timers notify through `channels`
/// and fire through `invoker`.
pub fn build_router(
    config: &PcBotConfig,
    channels: Arc<ChannelManager>,
    invoker: Arc<dyn ActionInvoker>,
) -> Arc<CommandRouter> {
    let notifier = Arc::new(ChannelNotifier::new(channels));
    let registry = TimerRegistry::new(notifier, invoker.clone());
    Arc::new(CommandRouter::new(registry, invoker).with_allowed_users(&config.telegram.allowed_users))
}

/// Start the gateway and run until Ctrl-C.
pub async fn start_gateway(
    config: &PcBotConfig,
    plugins: Vec<Arc<dyn ChannelPlugin>>,
    invoker: Arc<dyn ActionInvoker>,
) -> anyhow::Result<()> {
    let channel_mgr = Arc::new(ChannelManager::new(256));
    for plugin in plugins {
        channel_mgr.register(plugin).await;
    }

    let router = build_router(config, channel_mgr.clone(), invoker);

    let started = channel_mgr.start_all().await;
    if started == 0 {
        anyhow::bail!("No channel could be started");
    }
    info!("Started {started} channel(s)");
    for channel in channel_mgr.list_channels().await {
        info!(
            channel_type = %channel.channel_type,
            channel_id = %channel.channel_id,
            status = ?channel.status,
            "Channel status"
        );
    }

    let channel_mgr_loop = channel_mgr.clone();
    let loop_handle = tokio::spawn(async move {
        channel_mgr_loop.run_message_loop(router).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping channels");

    channel_mgr.stop_all().await;
    loop_handle.abort();
    Ok(())
}
