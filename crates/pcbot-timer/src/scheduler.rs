//! One-shot deferred tasks with exact cancellation results.
//!
//! A scheduled task is in one of three states: pending, fired, or
//! cancelled. The first of "deadline reached" and "cancel requested" to
//! move it out of pending wins, so [`TaskScheduler::cancel`] reports
//! precisely whether the task will run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::trace;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to a scheduled task, used to cancel it before it fires.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PENDING)),
            token: CancellationToken::new(),
        }
    }

    /// Claim the task for cancellation. Returns `false` if it already fired
    /// or was cancelled earlier.
    pub fn cancel(&self) -> bool {
        let won = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.token.cancel();
        won
    }

    /// Claim the task for execution. Returns `false` if it was cancelled.
    fn fire(&self) -> bool {
        self.state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the task is still waiting for its deadline.
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }
}

/// Runs futures after a delay, with best-effort cancellation.
pub trait TaskScheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> CancelHandle;

    /// Prevent a scheduled task from running.
    ///
    /// Returns `true` if the task had not started and now never will.
    fn cancel(&self, handle: &CancelHandle) -> bool {
        handle.cancel()
    }
}

/// [`TaskScheduler`] backed by the tokio timer wheel.
///
/// Must be used from within a tokio runtime. Under `tokio::time::pause()`
/// the tasks follow virtual time.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> CancelHandle {
        let handle = CancelHandle::new();
        let guard = handle.clone();

        // tokio clamps deadlines past its far-future instant, so huge delays
        // simply never elapse.
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.token.cancelled() => {
                    trace!("Scheduled task cancelled before deadline");
                }
                _ = tokio::time::sleep(delay) => {
                    if guard.fire() {
                        task.await;
                    }
                }
            }
        });

        handle
    }
}
