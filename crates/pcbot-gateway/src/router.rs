//! Turns inbound messages into replies and timer registry operations.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use pcbot_timer::{ActionInvoker, TimerError, TimerRegistry};
use pcbot_types::{InboundMessage, OwnerId, PendingAction};

use crate::command::Command;
use crate::messages;

/// Outcome of routing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    /// Reply to send back to the originating chat.
    pub reply: String,
    /// Action to run right after the reply is sent.
    pub run_now: Option<PendingAction>,
}

impl Routed {
    fn reply(text: String) -> Self {
        Self {
            reply: text,
            run_now: None,
        }
    }
}

/// Dispatches commands and freeform text for every owner.
pub struct CommandRouter {
    registry: TimerRegistry,
    invoker: Arc<dyn ActionInvoker>,
    /// Sender IDs allowed to use the bot. Empty means everyone.
    allowed_senders: HashSet<String>,
}

impl CommandRouter {
    pub fn new(registry: TimerRegistry, invoker: Arc<dyn ActionInvoker>) -> Self {
        Self {
            registry,
            invoker,
            allowed_senders: HashSet::new(),
        }
    }

    /// Restrict the bot to the given user IDs.
    pub fn with_allowed_users(mut self, users: &[i64]) -> Self {
        self.allowed_senders = users.iter().map(|id| id.to_string()).collect();
        self
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        self.allowed_senders.is_empty() || self.allowed_senders.contains(sender_id)
    }

    /// Route one message. Never blocks; the caller sends the reply and
    /// runs [`Routed::run_now`] through [`CommandRouter::run_now`].
    pub fn route(&self, inbound: &InboundMessage) -> Routed {
        if !self.is_allowed(&inbound.sender_id) {
            warn!(sender = %inbound.sender_id, "Rejected message from unauthorized sender");
            return Routed::reply(messages::unauthorized());
        }

        let owner = inbound.owner();
        match Command::from_inbound(inbound) {
            Some(command) => self.handle_command(&owner, command),
            None => self.handle_text(&owner, &inbound.text),
        }
    }

    fn handle_command(&self, owner: &OwnerId, command: Command) -> Routed {
        info!(owner = %owner, ?command, "Handling command");

        match command {
            Command::Start | Command::Help => Routed::reply(messages::help()),
            Command::Shutdown => Routed {
                reply: messages::executing_now(PendingAction::Shutdown),
                run_now: Some(PendingAction::Shutdown),
            },
            Command::Restart => Routed {
                reply: messages::executing_now(PendingAction::Restart),
                run_now: Some(PendingAction::Restart),
            },
            Command::GetCurrentTimer => match self.registry.current_timer(owner) {
                Ok(timer) => Routed::reply(messages::active_timer(&timer)),
                Err(_) => Routed::reply(messages::no_active_timer()),
            },
            Command::CancelTimer => match self.registry.cancel_timer(owner) {
                Ok(action) => Routed::reply(messages::timer_cancelled(action)),
                Err(_) => Routed::reply(messages::nothing_to_cancel()),
            },
            Command::ShutdownTimer => self.begin_timer(owner, PendingAction::Shutdown),
            Command::RestartTimer => self.begin_timer(owner, PendingAction::Restart),
            Command::Unknown(name) => Routed::reply(messages::unknown_command(&name)),
        }
    }

    fn begin_timer(&self, owner: &OwnerId, action: PendingAction) -> Routed {
        self.registry.begin_timer_request(owner, action);
        Routed::reply(messages::timer_prompt(action))
    }

    fn handle_text(&self, owner: &OwnerId, text: &str) -> Routed {
        match self.registry.consume_pending_input(owner, text) {
            Ok(confirmation) => Routed::reply(messages::timer_set(&confirmation)),
            Err(TimerError::Parse(e)) => Routed::reply(messages::invalid_duration(&e)),
            Err(TimerError::NotAwaitingInput | TimerError::NoActiveTimer) => {
                Routed::reply(messages::not_a_command())
            }
        }
    }

    /// Run an immediate action. Failures are logged, not retried.
    pub async fn run_now(&self, action: PendingAction) {
        info!(action = %action, "Running immediate action");
        if let Err(e) = self.invoker.invoke(action).await {
            warn!(action = %action, "Immediate action failed: {e}");
        }
    }
}
