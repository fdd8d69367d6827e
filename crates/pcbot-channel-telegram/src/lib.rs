//! Telegram Bot channel plugin for pcbot.
//!
//! Uses Telegram Bot API with long-polling (no webhook required).
//!
//! # Configuration
//!
//! ```json5
//! telegram: {
//!     bot_token: "123456:ABC-DEF...",
//!     admin_chat_id: 2081422788,
//!     allowed_users: [2081422788],
//!     poll_timeout_secs: 30,
//! }
//! ```

pub mod api;
pub mod polling;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pcbot_gateway::channel::ChannelPlugin;
use pcbot_gateway::{command, messages};
use pcbot_types::{ChannelStatus, InboundMessage, OutboundMessage};

use api::TelegramApi;
use types::{BotCommand, MenuButton, SetChatMenuButtonParams, SetMyCommandsParams};

/// Telegram channel plugin implementing `ChannelPlugin`.
pub struct TelegramChannel {
    id: String,
    api: Arc<TelegramApi>,
    admin_chat_id: Option<i64>,
    poll_timeout: Duration,
    state: Mutex<TelegramState>,
}

struct TelegramState {
    status: ChannelStatus,
    cancel: Option<CancellationToken>,
    poll_handle: Option<JoinHandle<()>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel with the given ID and bot token.
    pub fn new(
        id: impl Into<String>,
        bot_token: &str,
        admin_chat_id: Option<i64>,
        poll_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: id.into(),
            api: Arc::new(TelegramApi::new(bot_token, poll_timeout)?),
            admin_chat_id,
            poll_timeout,
            state: Mutex::new(TelegramState {
                status: ChannelStatus::Stopped,
                cancel: None,
                poll_handle: None,
            }),
        })
    }

    /// Publish the command menu. Failures only degrade the client UI.
    async fn publish_commands(&self) {
        let commands = command::MENU
            .iter()
            .map(|(name, description)| BotCommand {
                command: (*name).to_string(),
                description: (*description).to_string(),
            })
            .collect();

        if let Err(e) = self
            .api
            .set_my_commands(&SetMyCommandsParams { commands })
            .await
        {
            warn!(channel_id = self.id, "Failed to register bot commands: {e}");
        }

        if let Err(e) = self
            .api
            .set_chat_menu_button(&SetChatMenuButtonParams {
                menu_button: MenuButton::Commands,
            })
            .await
        {
            warn!(channel_id = self.id, "Failed to set menu button: {e}");
        }
    }
}

#[async_trait::async_trait]
impl ChannelPlugin for TelegramChannel {
    fn channel_type(&self) -> &str {
        "telegram"
    }

    fn channel_id(&self) -> &str {
        &self.id
    }

    async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.status == ChannelStatus::Running {
            bail!("Telegram channel {} is already running", self.id);
        }

        state.status = ChannelStatus::Starting;

        // Verify bot token
        match self.api.get_me().await {
            Ok(bot) => {
                info!(
                    channel_id = self.id,
                    bot_username = bot.username.as_deref().unwrap_or("unknown"),
                    "Telegram bot authenticated"
                );
            }
            Err(e) => {
                state.status = ChannelStatus::Error(format!("Auth failed: {e}"));
                bail!("Failed to authenticate Telegram bot: {e}");
            }
        }

        self.publish_commands().await;

        if let Some(chat_id) = self.admin_chat_id {
            if let Err(e) = self.api.send_text(chat_id, &messages::startup()).await {
                warn!(channel_id = self.id, chat_id, "Failed to send startup notice: {e}");
            }
        }

        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let channel_id = self.id.clone();
        let api = self.api.clone();
        let poll_timeout = self.poll_timeout;

        let handle = tokio::spawn(async move {
            polling::run_polling_loop(&api, channel_id, poll_timeout, sender, cancel_child).await;
        });

        state.cancel = Some(cancel);
        state.poll_handle = Some(handle);
        state.status = ChannelStatus::Running;

        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        if let Some(handle) = state.poll_handle.take() {
            let _ = handle.await;
        }

        state.status = ChannelStatus::Stopped;
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let chat_id = message
            .recipient_id
            .parse::<i64>()
            .with_context(|| format!("invalid Telegram chat id: {}", message.recipient_id))?;

        self.api.send_text(chat_id, &message.text).await
    }

    fn status(&self) -> ChannelStatus {
        match self.state.try_lock() {
            Ok(state) => state.status.clone(),
            Err(_) => ChannelStatus::Starting,
        }
    }
}

/// Create the Telegram channel from the bot configuration.
pub fn create_telegram_channel(
    id: impl Into<String>,
    config: &pcbot_config::PcBotConfig,
) -> anyhow::Result<Arc<dyn ChannelPlugin>> {
    let bot_token = config.bot_token()?;
    let channel = TelegramChannel::new(
        id,
        &bot_token,
        config.telegram.admin_chat_id,
        Duration::from_secs(config.telegram.poll_timeout_secs),
    )?;
    Ok(Arc::new(channel))
}
