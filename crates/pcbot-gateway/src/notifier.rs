//! Timer notifications delivered through the owner's chat channel.

use std::sync::Arc;

use pcbot_timer::Notifier;
use pcbot_types::{OutboundMessage, OwnerId, PendingAction};

use crate::channel::ChannelManager;
use crate::messages;

/// [`Notifier`] that replies in the chat the owner set the timer from.
pub struct ChannelNotifier {
    channels: Arc<ChannelManager>,
}

impl ChannelNotifier {
    pub fn new(channels: Arc<ChannelManager>) -> Self {
        Self { channels }
    }
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, owner: &OwnerId, text: &str) -> anyhow::Result<()> {
        self.channels
            .send_message(OutboundMessage::to_owner(owner, text))
            .await
    }

    fn elapsed_text(&self, action: PendingAction) -> String {
        messages::timer_elapsed(action)
    }
}
