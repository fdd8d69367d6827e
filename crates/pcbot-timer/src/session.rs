//! Per-owner bookkeeping: the awaited timer request and the live timer.
//!
//! Both live in one [`OwnerSlot`] so they are always read and written
//! together under the registry lock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pcbot_types::PendingAction;
use tokio::time::Instant;

use crate::scheduler::CancelHandle;

/// Identifies one armed timer so a late callback can tell it was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) u64);

/// "The next freeform message from this owner is a duration."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAwait {
    pub action: PendingAction,
}

/// A scheduled deferred action.
#[derive(Debug)]
pub struct Timer {
    pub(crate) id: TimerId,
    pub action: PendingAction,
    pub duration: Duration,
    /// `None` when the deadline is past what the clock can represent.
    pub deadline: Option<Instant>,
    pub fire_at: Option<DateTime<Utc>>,
    pub(crate) cancel: CancelHandle,
}

impl Timer {
    /// Time left until the timer fires, if the deadline is representable.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Everything the registry tracks for one owner.
#[derive(Debug, Default)]
pub struct OwnerSlot {
    pub awaiting: Option<SessionAwait>,
    pub timer: Option<Timer>,
}

impl OwnerSlot {
    /// A slot with neither an awaited request nor a timer can be dropped.
    pub fn is_idle(&self) -> bool {
        self.awaiting.is_none() && self.timer.is_none()
    }

    pub fn state(&self) -> OwnerState {
        match (&self.awaiting, &self.timer) {
            (Some(awaiting), scheduled) => OwnerState::AwaitingInput {
                action: awaiting.action,
                scheduled: scheduled.as_ref().map(|t| t.action),
            },
            (None, Some(timer)) => OwnerState::Scheduled {
                action: timer.action,
            },
            (None, None) => OwnerState::Idle,
        }
    }
}

/// Observable per-owner state.
///
/// `AwaitingInput` may coexist with an older scheduled timer: the timer is
/// only replaced once a valid duration arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerState {
    Idle,
    AwaitingInput {
        action: PendingAction,
        scheduled: Option<PendingAction>,
    },
    Scheduled {
        action: PendingAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot_is_idle() {
        let slot = OwnerSlot::default();
        assert!(slot.is_idle());
        assert_eq!(slot.state(), OwnerState::Idle);
    }

    #[test]
    fn test_awaiting_slot() {
        let slot = OwnerSlot {
            awaiting: Some(SessionAwait {
                action: PendingAction::Restart,
            }),
            timer: None,
        };
        assert!(!slot.is_idle());
        assert_eq!(
            slot.state(),
            OwnerState::AwaitingInput {
                action: PendingAction::Restart,
                scheduled: None,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down() {
        let timer = Timer {
            id: TimerId(1),
            action: PendingAction::Shutdown,
            duration: Duration::from_secs(60),
            deadline: Some(Instant::now() + Duration::from_secs(60)),
            fire_at: None,
            cancel: CancelHandle::new(),
        };
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(timer.remaining(), Some(Duration::from_secs(40)));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(timer.remaining(), Some(Duration::ZERO));
        assert_eq!(
            OwnerSlot {
                awaiting: None,
                timer: Some(timer),
            }
            .state(),
            OwnerState::Scheduled {
                action: PendingAction::Shutdown
            }
        );
    }
}
