//! Telegram Bot API HTTP client.

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{
    ApiResponse, BotInfo, GetUpdatesParams, SendMessageParams, SetChatMenuButtonParams,
    SetMyCommandsParams, TgMessage, Update,
};

/// Slack added on top of the long-poll timeout before the HTTP request gives up.
const REQUEST_SLACK: Duration = Duration::from_secs(30);

/// HTTP client for the Telegram Bot API.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client with the given bot token.
    ///
    /// `poll_timeout` is the `getUpdates` long-poll timeout; the HTTP timeout
    /// is set above it so idle polls are not cut short.
    pub fn new(bot_token: &str, poll_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(poll_timeout + REQUEST_SLACK)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        })
    }

    async fn call<P, R>(&self, method: &str, params: Option<&P>) -> anyhow::Result<Option<R>>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);
        let request = match params {
            Some(params) => self.client.post(url).json(params),
            None => self.client.get(url),
        };

        let resp: ApiResponse<R> = request
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} response parse failed"))?;

        if !resp.ok {
            bail!(
                "{method} failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(resp.result)
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn get_me(&self) -> anyhow::Result<BotInfo> {
        self.call::<(), _>("getMe", None)
            .await?
            .context("getMe returned no result")
    }

    /// Long-poll for updates.
    pub async fn get_updates(&self, params: &GetUpdatesParams) -> anyhow::Result<Vec<Update>> {
        Ok(self.call("getUpdates", Some(params)).await?.unwrap_or_default())
    }

    /// Register bot commands in the menu.
    pub async fn set_my_commands(&self, params: &SetMyCommandsParams) -> anyhow::Result<()> {
        self.call::<_, bool>("setMyCommands", Some(params)).await?;
        Ok(())
    }

    /// Set the bot's menu button (shown left of the input field).
    pub async fn set_chat_menu_button(
        &self,
        params: &SetChatMenuButtonParams,
    ) -> anyhow::Result<()> {
        self.call::<_, bool>("setChatMenuButton", Some(params)).await?;
        Ok(())
    }

    /// Send a text message.
    pub async fn send_message(&self, params: &SendMessageParams) -> anyhow::Result<TgMessage> {
        self.call("sendMessage", Some(params))
            .await?
            .context("sendMessage returned no result")
    }

    /// Send `text` as Markdown, falling back to plain text when Telegram
    /// rejects the markup.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let markdown = self
            .send_message(&SendMessageParams {
                chat_id,
                text: text.to_string(),
                parse_mode: Some("Markdown".into()),
            })
            .await;

        if let Err(e) = markdown {
            tracing::debug!(chat_id, "Markdown send failed, retrying as plain text: {e}");
            self.send_message(&SendMessageParams {
                chat_id,
                text: text.to_string(),
                parse_mode: None,
            })
            .await?;
        }
        Ok(())
    }
}
