//! Bot commands.

use pcbot_types::InboundMessage;

/// A slash command sent to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Shutdown,
    Restart,
    ShutdownTimer,
    RestartTimer,
    GetCurrentTimer,
    CancelTimer,
    Unknown(String),
}

/// Commands shown in the client's command menu, in display order.
pub const MENU: &[(&str, &str)] = &[
    ("shutdown", "⏹️ Shutdown PC"),
    ("restart", "🔄 Restart PC"),
    ("shutdown_timer", "⏰ Set shutdown timer"),
    ("restart_timer", "⏰ Set restart timer"),
    ("cancel_timer", "❌ Cancel active timer"),
    ("get_current_timer", "ℹ️ Check active timer"),
    ("help", "📖 List commands"),
];

impl Command {
    /// Map a command name (without `/` or `@botname`) to a command.
    pub fn parse(name: &str) -> Self {
        match name {
            "start" => Command::Start,
            "help" => Command::Help,
            "shutdown" => Command::Shutdown,
            "restart" => Command::Restart,
            "shutdown_timer" => Command::ShutdownTimer,
            "restart_timer" => Command::RestartTimer,
            "get_current_timer" => Command::GetCurrentTimer,
            "cancel_timer" => Command::CancelTimer,
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Extract the command from an inbound message.
    ///
    /// Prefers the `command` metadata set by channels that detect commands
    /// natively; otherwise looks for a leading `/` in the text.
    pub fn from_inbound(message: &InboundMessage) -> Option<Self> {
        if let Some(name) = message.metadata.get("command").and_then(|v| v.as_str()) {
            return Some(Self::parse(name));
        }

        let rest = message.text.trim_start().strip_prefix('/')?;
        let token = rest.split_whitespace().next().unwrap_or("");
        let name = token.split('@').next().unwrap_or("");
        Some(Self::parse(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn inbound(text: &str) -> InboundMessage {
        InboundMessage {
            channel_type: "telegram".into(),
            channel_id: "tg".into(),
            chat_id: "1".into(),
            sender_id: "1".into(),
            sender_name: None,
            text: text.into(),
            metadata: HashMap::new(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_parse_known() {
        assert_eq!(Command::parse("shutdown_timer"), Command::ShutdownTimer);
        assert_eq!(Command::parse("cancel_timer"), Command::CancelTimer);
        assert_eq!(Command::parse("stats"), Command::Unknown("stats".into()));
    }

    #[test]
    fn test_from_text() {
        assert_eq!(Command::from_inbound(&inbound("/restart")), Some(Command::Restart));
        assert_eq!(
            Command::from_inbound(&inbound("/get_current_timer@pc_bot extra")),
            Some(Command::GetCurrentTimer)
        );
        assert_eq!(Command::from_inbound(&inbound("5m")), None);
        assert_eq!(
            Command::from_inbound(&inbound("/")),
            Some(Command::Unknown(String::new()))
        );
    }

    #[test]
    fn test_metadata_wins() {
        let mut msg = inbound("/shutdown");
        msg.metadata
            .insert("command".into(), serde_json::Value::String("help".into()));
        assert_eq!(Command::from_inbound(&msg), Some(Command::Help));
    }

    #[test]
    fn test_menu_commands_parse() {
        for (name, _) in MENU {
            assert!(!matches!(Command::parse(name), Command::Unknown(_)));
        }
    }
}
