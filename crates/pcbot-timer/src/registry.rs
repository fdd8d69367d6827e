//! Timer registry: at most one deferred action per owner.
//!
//! All owner state sits behind a single mutex. The lock is held only for
//! map updates; notifications and host actions run after it is released.
//!
//! # Cancellation
//!
//! A firing callback re-checks the registry before doing anything: it
//! proceeds only if the slot still holds its own [`TimerId`]. A cancel or
//! supersede that takes the lock first therefore always wins. Once the
//! callback has removed its timer the action runs regardless, and a
//! cancel arriving after that point reports [`TimerError::NoActiveTimer`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use pcbot_types::{OwnerId, PendingAction};

use crate::duration::{ParseDurationError, parse_duration};
use crate::scheduler::{TaskScheduler, TokioScheduler};
use crate::session::{OwnerSlot, OwnerState, SessionAwait, Timer, TimerId};
use crate::{ActionInvoker, Notifier};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error(transparent)]
    Parse(#[from] ParseDurationError),
    /// Input arrived for an owner that never asked to set a timer.
    #[error("no timer request is waiting for input")]
    NotAwaitingInput,
    /// Query or cancel for an owner without a scheduled timer.
    #[error("no active timer")]
    NoActiveTimer,
}

/// Result of a successfully scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfirmation {
    pub action: PendingAction,
    pub duration: Duration,
    pub fire_at: Option<DateTime<Utc>>,
    /// Action of the timer this one replaced, if any.
    pub replaced: Option<PendingAction>,
}

/// Snapshot of an owner's scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTimer {
    pub action: PendingAction,
    pub duration: Duration,
    pub remaining: Option<Duration>,
    pub fire_at: Option<DateTime<Utc>>,
}

struct RegistryInner {
    slots: Mutex<HashMap<OwnerId, OwnerSlot>>,
    next_id: AtomicU64,
    notifier: Arc<dyn Notifier>,
    invoker: Arc<dyn ActionInvoker>,
}

impl RegistryInner {
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<OwnerId, OwnerSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns every owner's awaited request and scheduled timer.
#[derive(Clone)]
pub struct TimerRegistry {
    inner: Arc<RegistryInner>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl TimerRegistry {
    /// Create a registry that schedules on the tokio runtime.
    pub fn new(notifier: Arc<dyn Notifier>, invoker: Arc<dyn ActionInvoker>) -> Self {
        Self::with_scheduler(Arc::new(TokioScheduler::new()), notifier, invoker)
    }

    /// Create a registry with a custom scheduler.
    pub fn with_scheduler(
        scheduler: Arc<dyn TaskScheduler>,
        notifier: Arc<dyn Notifier>,
        invoker: Arc<dyn ActionInvoker>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                notifier,
                invoker,
            }),
            scheduler,
        }
    }

    /// Mark the owner's next freeform message as duration input for `action`.
    ///
    /// Replaces any earlier request from the same owner. A scheduled timer
    /// is left alone until a valid duration arrives.
    pub fn begin_timer_request(&self, owner: &OwnerId, action: PendingAction) {
        let mut slots = self.inner.lock_slots();
        let slot = slots.entry(owner.clone()).or_default();
        if let Some(previous) = slot.awaiting.replace(SessionAwait { action }) {
            debug!(owner = %owner, previous = %previous.action, "Replacing pending timer request");
        }
        debug!(owner = %owner, action = %action, "Awaiting timer duration");
    }

    /// The action the owner's next message would schedule, if any.
    pub fn awaiting_action(&self, owner: &OwnerId) -> Option<PendingAction> {
        self.inner
            .lock_slots()
            .get(owner)
            .and_then(|slot| slot.awaiting)
            .map(|awaiting| awaiting.action)
    }

    /// Consume the owner's awaited request using `raw` as the duration.
    ///
    /// The request is cleared whether or not `raw` parses. On success any
    /// existing timer is cancelled and replaced in the same critical section.
    pub fn consume_pending_input(
        &self,
        owner: &OwnerId,
        raw: &str,
    ) -> Result<TimerConfirmation, TimerError> {
        let mut slots = self.inner.lock_slots();

        let Some(awaiting) = slots.get_mut(owner).and_then(|slot| slot.awaiting.take()) else {
            return Err(TimerError::NotAwaitingInput);
        };

        let duration = match parse_duration(raw) {
            Ok(duration) => duration,
            Err(e) => {
                remove_if_idle(&mut slots, owner);
                debug!(owner = %owner, input = raw, "Rejected timer input: {e}");
                return Err(e.into());
            }
        };

        let slot = slots.entry(owner.clone()).or_default();
        let replaced = slot.timer.take().map(|old| {
            let stopped = self.scheduler.cancel(&old.cancel);
            debug!(owner = %owner, action = %old.action, stopped, "Superseding timer");
            old.action
        });

        let id = TimerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let action = awaiting.action;
        let fire_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        let cancel = self.scheduler.schedule(
            duration,
            fire_timer(self.inner.clone(), owner.clone(), id),
        );

        slot.timer = Some(Timer {
            id,
            action,
            duration,
            deadline: Instant::now().checked_add(duration),
            fire_at,
            cancel,
        });

        info!(
            owner = %owner,
            action = %action,
            secs = duration.as_secs_f64(),
            "Timer scheduled"
        );

        Ok(TimerConfirmation {
            action,
            duration,
            fire_at,
            replaced,
        })
    }

    /// The owner's scheduled timer, or [`TimerError::NoActiveTimer`].
    pub fn current_timer(&self, owner: &OwnerId) -> Result<ActiveTimer, TimerError> {
        let slots = self.inner.lock_slots();
        let timer = slots
            .get(owner)
            .and_then(|slot| slot.timer.as_ref())
            .ok_or(TimerError::NoActiveTimer)?;

        Ok(ActiveTimer {
            action: timer.action,
            duration: timer.duration,
            remaining: timer.remaining(),
            fire_at: timer.fire_at,
        })
    }

    /// Cancel the owner's scheduled timer and any awaited request.
    ///
    /// Returns the cancelled action. Without a scheduled timer nothing is
    /// changed and [`TimerError::NoActiveTimer`] is returned.
    pub fn cancel_timer(&self, owner: &OwnerId) -> Result<PendingAction, TimerError> {
        let mut slots = self.inner.lock_slots();
        let timer = slots
            .get_mut(owner)
            .and_then(|slot| slot.timer.take())
            .ok_or(TimerError::NoActiveTimer)?;
        slots.remove(owner);

        let stopped = self.scheduler.cancel(&timer.cancel);
        info!(owner = %owner, action = %timer.action, stopped, "Timer cancelled");
        Ok(timer.action)
    }

    /// Observable state for one owner.
    pub fn state(&self, owner: &OwnerId) -> OwnerState {
        self.inner
            .lock_slots()
            .get(owner)
            .map_or(OwnerState::Idle, OwnerSlot::state)
    }

    /// Number of scheduled timers across all owners.
    pub fn active_timers(&self) -> usize {
        self.inner
            .lock_slots()
            .values()
            .filter(|slot| slot.timer.is_some())
            .count()
    }
}

fn remove_if_idle(slots: &mut HashMap<OwnerId, OwnerSlot>, owner: &OwnerId) {
    if slots.get(owner).is_some_and(OwnerSlot::is_idle) {
        slots.remove(owner);
    }
}

/// Callback armed for one timer. Does nothing if the timer was cancelled
/// or superseded before the callback got the lock.
fn fire_timer(inner: Arc<RegistryInner>, owner: OwnerId, id: TimerId) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let action = {
            let mut slots = inner.lock_slots();
            let Some(timer) = slots
                .get_mut(&owner)
                .and_then(|slot| slot.timer.take_if(|timer| timer.id == id))
            else {
                debug!(owner = %owner, "Timer callback found its timer gone; skipping");
                return;
            };
            remove_if_idle(&mut slots, &owner);
            timer.action
        };

        info!(owner = %owner, action = %action, "Timer elapsed");

        let text = inner.notifier.elapsed_text(action);
        if let Err(e) = inner.notifier.notify(&owner, &text).await {
            warn!(owner = %owner, "Failed to deliver timer notification: {e}");
        }
        if let Err(e) = inner.invoker.invoke(action).await {
            warn!(owner = %owner, action = %action, "Timed action failed: {e}");
        }
    })
}
