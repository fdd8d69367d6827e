use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ──────────────────── Action Types ────────────────────

/// A privileged host action that can be run now or deferred by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Shutdown,
    Restart,
}

impl PendingAction {
    /// Present participle used in user-facing text ("shutting down").
    pub fn progressive(&self) -> &'static str {
        match self {
            PendingAction::Shutdown => "shutting down",
            PendingAction::Restart => "restarting",
        }
    }
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingAction::Shutdown => f.write_str("shutdown"),
            PendingAction::Restart => f.write_str("restart"),
        }
    }
}

// ──────────────────── Owner Types ────────────────────

/// Identity of the user session that owns timer state.
///
/// Two messages belong to the same owner only if channel, chat and sender
/// all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId {
    /// Channel instance the owner talks through.
    pub channel_id: String,
    /// Chat the owner talks in; replies go here.
    pub chat_id: String,
    /// External user identifier.
    pub sender_id: String,
}

impl OwnerId {
    pub fn new(
        channel_id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
        }
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.channel_id, self.chat_id, self.sender_id)
    }
}

// ──────────────────── Channel Types ────────────────────

/// Message from an external channel to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel type (e.g. "telegram").
    pub channel_type: String,
    /// Unique channel instance ID.
    pub channel_id: String,
    /// Chat the message was posted in.
    pub chat_id: String,
    /// External user/sender identifier.
    pub sender_id: String,
    /// Display name of the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    /// Platform-specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Message timestamp (unix millis).
    pub timestamp: i64,
}

impl InboundMessage {
    /// The owner this message's timer state is keyed by.
    pub fn owner(&self) -> OwnerId {
        OwnerId::new(&self.channel_id, &self.chat_id, &self.sender_id)
    }
}

/// Message from the gateway to an external channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Unique channel instance ID.
    pub channel_id: String,
    /// Recipient chat on the external platform.
    pub recipient_id: String,
    /// Response text content.
    pub text: String,
    /// Platform-specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OutboundMessage {
    /// Build a plain reply addressed to an owner's chat.
    pub fn to_owner(owner: &OwnerId, text: impl Into<String>) -> Self {
        Self {
            channel_id: owner.channel_id.clone(),
            recipient_id: owner.chat_id.clone(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Status of a channel plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Channel is not running.
    Stopped,
    /// Channel is initializing.
    Starting,
    /// Channel is running and accepting messages.
    Running,
    /// Channel encountered an error.
    Error(String),
}

/// Summary information about a registered channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_type: String,
    pub channel_id: String,
    pub status: ChannelStatus,
}
