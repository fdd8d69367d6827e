//! Channel plugin framework for chat platforms.
//!
//! ```text
//! Chat platform
//!     ↓ (platform-specific protocol)
//! ChannelPlugin::start() spawns listener
//!     ↓ (InboundMessage via mpsc)
//! ChannelManager → CommandRouter::route()
//!     ↓ (reply text, optional immediate action)
//! ChannelPlugin::send(OutboundMessage)
//!     ↓ (platform-specific protocol)
//! Chat platform
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use pcbot_types::{ChannelInfo, ChannelStatus, InboundMessage, OutboundMessage};

use crate::router::CommandRouter;

/// Trait for channel plugins that bridge chat platforms to the gateway.
///
/// All methods take `&self`; implementations keep mutable state behind
/// a `Mutex` or `RwLock`.
#[async_trait::async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Returns the channel type identifier (e.g. "telegram").
    fn channel_type(&self) -> &str;

    /// Returns the unique instance identifier for this channel.
    fn channel_id(&self) -> &str;

    /// Start the channel, connecting to the external platform.
    ///
    /// The `sender` should be used to push incoming messages to the gateway.
    async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Stop the channel, disconnecting from the external platform.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Send a message to the external platform.
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Returns the current status of this channel.
    fn status(&self) -> ChannelStatus;
}

/// Owns the registered channels and the shared inbound queue.
pub struct ChannelManager {
    channels: RwLock<HashMap<String, Arc<dyn ChannelPlugin>>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
}

impl ChannelManager {
    /// Create a new channel manager with the given buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        Self {
            channels: RwLock::new(HashMap::new()),
            inbound_tx: tx,
            inbound_rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Register a channel plugin. Replaces any existing channel with the same ID.
    pub async fn register(&self, channel: Arc<dyn ChannelPlugin>) {
        let id = channel.channel_id().to_string();
        info!(
            channel_type = channel.channel_type(),
            channel_id = %id,
            "Registering channel plugin"
        );
        self.channels.write().await.insert(id, channel);
    }

    /// Start all registered channels. Returns how many started.
    pub async fn start_all(&self) -> usize {
        let channels = self.channels.read().await;
        let mut started = 0;
        for (id, channel) in channels.iter() {
            match channel.start(self.inbound_tx.clone()).await {
                Ok(()) => started += 1,
                Err(e) => warn!(channel_id = %id, "Failed to start channel: {e}"),
            }
        }
        started
    }

    /// Stop all registered channels.
    pub async fn stop_all(&self) {
        let channels = self.channels.read().await;
        for (id, channel) in channels.iter() {
            if let Err(e) = channel.stop().await {
                warn!(channel_id = %id, "Failed to stop channel: {e}");
            }
        }
    }

    /// Send a message through the channel it is addressed to.
    pub async fn send_message(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let channel = self
            .channels
            .read()
            .await
            .get(&message.channel_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Channel not found: {}", message.channel_id))?;

        channel.send(message).await
    }

    /// List all registered channels with their status.
    pub async fn list_channels(&self) -> Vec<ChannelInfo> {
        let channels = self.channels.read().await;
        channels
            .values()
            .map(|ch| ChannelInfo {
                channel_type: ch.channel_type().to_string(),
                channel_id: ch.channel_id().to_string(),
                status: ch.status(),
            })
            .collect()
    }

    /// Run the inbound message processing loop.
    ///
    /// Routing happens inline so messages from one owner are applied in
    /// arrival order; reply delivery and immediate actions are spawned.
    pub async fn run_message_loop(self: &Arc<Self>, router: Arc<CommandRouter>) {
        let mut rx = self.inbound_rx.lock().await;

        info!("Channel message loop started");

        while let Some(inbound) = rx.recv().await {
            debug!(
                channel_id = %inbound.channel_id,
                sender = %inbound.sender_id,
                "Processing inbound message"
            );

            let routed = router.route(&inbound);
            let outbound = OutboundMessage {
                channel_id: inbound.channel_id,
                recipient_id: inbound.chat_id,
                text: routed.reply,
                metadata: inbound.metadata,
            };

            let channel_mgr = self.clone();
            let router = router.clone();
            tokio::spawn(async move {
                if let Err(e) = channel_mgr.send_message(outbound).await {
                    warn!("Failed to send reply to channel: {e}");
                }
                if let Some(action) = routed.run_now {
                    router.run_now(action).await;
                }
            });
        }

        info!("Channel message loop stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU8, Ordering};

    /// A mock channel plugin that records what it is asked to send.
    pub(crate) struct MockChannel {
        id: String,
        state: AtomicU8, // 0=stopped, 2=running
        pub(crate) sent: Mutex<Vec<OutboundMessage>>,
        pub(crate) sender: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    }

    impl MockChannel {
        pub(crate) fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                state: AtomicU8::new(0),
                sent: Mutex::new(Vec::new()),
                sender: Mutex::new(None),
            }
        }

        pub(crate) fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
        }
    }

    #[async_trait::async_trait]
    impl ChannelPlugin for MockChannel {
        fn channel_type(&self) -> &str {
            "mock"
        }

        fn channel_id(&self) -> &str {
            &self.id
        }

        async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
            *self.sender.lock().unwrap() = Some(sender);
            self.state.store(2, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.state.store(0, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        fn status(&self) -> ChannelStatus {
            match self.state.load(Ordering::SeqCst) {
                0 => ChannelStatus::Stopped,
                2 => ChannelStatus::Running,
                _ => ChannelStatus::Error("unknown".into()),
            }
        }
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let mgr = ChannelManager::new(16);
        assert!(mgr.list_channels().await.is_empty());

        mgr.register(Arc::new(MockChannel::new("test-1"))).await;

        let list = mgr.list_channels().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].channel_type, "mock");
        assert_eq!(list[0].status, ChannelStatus::Stopped);
    }

    #[tokio::test]
    async fn test_start_and_stop_all() {
        let mgr = ChannelManager::new(16);
        mgr.register(Arc::new(MockChannel::new("a"))).await;
        mgr.register(Arc::new(MockChannel::new("b"))).await;

        assert_eq!(mgr.start_all().await, 2);
        assert!(mgr
            .list_channels()
            .await
            .iter()
            .all(|c| c.status == ChannelStatus::Running));

        mgr.stop_all().await;
        assert!(mgr
            .list_channels()
            .await
            .iter()
            .all(|c| c.status == ChannelStatus::Stopped));
    }

    #[tokio::test]
    async fn test_send_message() {
        let mgr = ChannelManager::new(16);
        let ch = Arc::new(MockChannel::new("test-1"));
        mgr.register(ch.clone()).await;

        let msg = OutboundMessage {
            channel_id: "test-1".into(),
            recipient_id: "user-1".into(),
            text: "Hello!".into(),
            metadata: HashMap::new(),
        };
        mgr.send_message(msg).await.unwrap();

        assert_eq!(ch.texts(), vec!["Hello!"]);
    }

    #[tokio::test]
    async fn test_send_message_channel_not_found() {
        let mgr = ChannelManager::new(16);
        let msg = OutboundMessage {
            channel_id: "nonexistent".into(),
            recipient_id: "user-1".into(),
            text: "Hello!".into(),
            metadata: HashMap::new(),
        };

        assert!(mgr.send_message(msg).await.is_err());
    }
}
