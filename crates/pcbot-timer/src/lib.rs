//! pcbot-timer: per-owner deferred shutdown/restart timers.
//!
//! The flow for one owner:
//!
//! ```text
//! Idle ──begin_timer_request──▶ AwaitingInput ──valid duration──▶ Scheduled
//!  ▲                                  │                              │
//!  └──────────── parse error ─────────┘        fired / cancelled ────┘
//! ```
//!
//! Side effects (notifications, host actions) go through the [`Notifier`]
//! and [`ActionInvoker`] traits so the registry can be driven by any chat
//! channel and tested without touching the host.

pub mod duration;
pub mod registry;
pub mod scheduler;
pub mod session;

pub use duration::{ParseDurationError, humanize, parse_duration};
pub use registry::{ActiveTimer, TimerConfirmation, TimerError, TimerRegistry};
pub use scheduler::{CancelHandle, TaskScheduler, TokioScheduler};
pub use session::OwnerState;

use pcbot_types::{OwnerId, PendingAction};

/// Delivers a text notification to an owner.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: &OwnerId, text: &str) -> anyhow::Result<()>;

    /// Text announcing that a timer for `action` has elapsed.
    fn elapsed_text(&self, action: PendingAction) -> String;
}

/// Carries out a privileged host action.
#[async_trait::async_trait]
pub trait ActionInvoker: Send + Sync {
    async fn invoke(&self, action: PendingAction) -> anyhow::Result<()>;
}
