//! Telegram long-polling loop.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pcbot_types::InboundMessage;

use crate::api::TelegramApi;
use crate::types::{GetUpdatesParams, Update};

/// Convert a Telegram update into an `InboundMessage`.
///
/// Returns `None` for updates without a text message.
pub fn update_to_inbound(update: Update, channel_id: &str) -> Option<InboundMessage> {
    let msg = update.message?;

    let mut metadata = HashMap::new();
    metadata.insert(
        "message_id".into(),
        serde_json::Value::Number(msg.message_id.into()),
    );
    if let Some(command) = msg.command() {
        metadata.insert("command".into(), serde_json::Value::String(command.to_string()));
    }

    let chat_id = msg.chat.id.to_string();
    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| chat_id.clone());
    let sender_name = msg.from.as_ref().map(|u| u.display_name());

    Some(InboundMessage {
        channel_type: "telegram".into(),
        channel_id: channel_id.to_string(),
        chat_id,
        sender_id,
        sender_name,
        text: msg.text?,
        metadata,
        timestamp: msg.date * 1000,
    })
}

/// Run the long-polling loop, converting Telegram updates to `InboundMessage`.
///
/// Exits when `cancel` is cancelled or the `sender` is closed.
pub async fn run_polling_loop(
    api: &TelegramApi,
    channel_id: String,
    poll_timeout: Duration,
    sender: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!(channel_id, "Telegram polling loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let params = GetUpdatesParams {
            offset,
            timeout: Some(poll_timeout.as_secs()),
            allowed_updates: Some(vec!["message".into()]),
        };

        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_updates(&params) => result,
        };

        match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);

                for update in updates {
                    let update_id = update.update_id;
                    offset = Some(update_id + 1);

                    let Some(inbound) = update_to_inbound(update, &channel_id) else {
                        continue;
                    };

                    debug!(channel_id, update_id, "Forwarding Telegram message");

                    if sender.send(inbound).await.is_err() {
                        info!(channel_id, "Inbound channel closed, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(
                    channel_id,
                    backoff_secs = backoff.as_secs(),
                    "getUpdates error: {e}"
                );

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!(channel_id, "Telegram polling loop stopped");
}
