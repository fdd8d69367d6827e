//! End-to-end timer flows driven by tokio's paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcbot_timer::{
    ActionInvoker, Notifier, OwnerState, ParseDurationError, TimerError, TimerRegistry,
};
use pcbot_types::{OwnerId, PendingAction};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(OwnerId, String)>>,
}

impl RecordingNotifier {
    fn for_owner(&self, owner: &OwnerId) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o == owner)
            .count()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, owner: &OwnerId, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((owner.clone(), text.to_string()));
        Ok(())
    }

    fn elapsed_text(&self, action: PendingAction) -> String {
        format!("{action} timer elapsed")
    }
}

#[derive(Default)]
struct RecordingInvoker {
    invoked: Mutex<Vec<PendingAction>>,
}

impl RecordingInvoker {
    fn calls(&self) -> Vec<PendingAction> {
        self.invoked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ActionInvoker for RecordingInvoker {
    async fn invoke(&self, action: PendingAction) -> anyhow::Result<()> {
        self.invoked.lock().unwrap().push(action);
        Ok(())
    }
}

struct Harness {
    registry: TimerRegistry,
    notifier: Arc<RecordingNotifier>,
    invoker: Arc<RecordingInvoker>,
}

fn harness() -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let invoker = Arc::new(RecordingInvoker::default());
    let registry = TimerRegistry::new(notifier.clone(), invoker.clone());
    Harness {
        registry,
        notifier,
        invoker,
    }
}

fn owner(name: &str) -> OwnerId {
    OwnerId::new("telegram", format!("chat-{name}"), format!("user-{name}"))
}

#[tokio::test(start_paused = true)]
async fn shutdown_timer_fires_once() {
    let h = harness();
    let a = owner("a");

    h.registry.begin_timer_request(&a, PendingAction::Shutdown);
    let confirmation = h.registry.consume_pending_input(&a, "2s").unwrap();
    assert_eq!(confirmation.action, PendingAction::Shutdown);
    assert_eq!(confirmation.duration, Duration::from_secs(2));
    assert_eq!(
        h.registry.current_timer(&a).unwrap().action,
        PendingAction::Shutdown
    );

    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert!(h.invoker.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.invoker.calls(), vec![PendingAction::Shutdown]);
    assert_eq!(h.notifier.for_owner(&a), 1);
    assert_eq!(h.registry.current_timer(&a), Err(TimerError::NoActiveTimer));
    assert_eq!(h.registry.state(&a), OwnerState::Idle);

    // Nothing else fires later.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(h.invoker.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_input_then_retry() {
    let h = harness();
    let b = owner("b");

    h.registry.begin_timer_request(&b, PendingAction::Restart);
    let err = h.registry.consume_pending_input(&b, "abc").unwrap_err();
    assert!(matches!(
        err,
        TimerError::Parse(ParseDurationError::InvalidUnit(_))
            | TimerError::Parse(ParseDurationError::InvalidNumber(_))
    ));
    assert_eq!(h.registry.current_timer(&b), Err(TimerError::NoActiveTimer));
    assert_eq!(h.registry.state(&b), OwnerState::Idle);

    h.registry.begin_timer_request(&b, PendingAction::Restart);
    h.registry.consume_pending_input(&b, "1m").unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(h.invoker.calls(), vec![PendingAction::Restart]);
    assert_eq!(h.notifier.for_owner(&b), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_restart_never_fires() {
    let h = harness();
    let c = owner("c");

    h.registry.begin_timer_request(&c, PendingAction::Restart);
    h.registry.consume_pending_input(&c, "10m").unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.registry.cancel_timer(&c), Ok(PendingAction::Restart));
    assert_eq!(h.registry.current_timer(&c), Err(TimerError::NoActiveTimer));

    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    assert!(h.invoker.calls().is_empty());
    assert_eq!(h.notifier.for_owner(&c), 0);
}

#[tokio::test(start_paused = true)]
async fn superseded_timer_never_fires() {
    let h = harness();
    let a = owner("a");

    h.registry.begin_timer_request(&a, PendingAction::Shutdown);
    h.registry.consume_pending_input(&a, "10s").unwrap();

    h.registry.begin_timer_request(&a, PendingAction::Restart);
    let confirmation = h.registry.consume_pending_input(&a, "30s").unwrap();
    assert_eq!(confirmation.replaced, Some(PendingAction::Shutdown));

    // Past the first deadline: nothing yet.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(h.invoker.calls().is_empty());
    assert_eq!(
        h.registry.current_timer(&a).unwrap().action,
        PendingAction::Restart
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.invoker.calls(), vec![PendingAction::Restart]);
    assert_eq!(h.notifier.for_owner(&a), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_with_nothing_scheduled() {
    let h = harness();
    let d = owner("d");

    assert_eq!(h.registry.cancel_timer(&d), Err(TimerError::NoActiveTimer));
    assert_eq!(h.registry.state(&d), OwnerState::Idle);
    assert_eq!(h.registry.active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_timer_per_owner() {
    let h = harness();
    let owners = [owner("a"), owner("b"), owner("c")];

    for round in 0..5u64 {
        for (i, o) in owners.iter().enumerate() {
            let action = if (round + i as u64) % 2 == 0 {
                PendingAction::Shutdown
            } else {
                PendingAction::Restart
            };
            h.registry.begin_timer_request(o, action);
            let input = if round == 2 { "nope".to_string() } else { format!("{}m", 10 + round) };
            let _ = h.registry.consume_pending_input(o, &input);
            assert!(h.registry.active_timers() <= owners.len());
        }
        if round == 3 {
            h.registry.cancel_timer(&owners[1]).unwrap();
        }
    }

    assert_eq!(h.registry.active_timers(), owners.len());

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert_eq!(h.invoker.calls().len(), owners.len());
    for o in &owners {
        assert_eq!(h.notifier.for_owner(o), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_owners_from_many_tasks() {
    let h = harness();
    let registry = h.registry.clone();

    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let o = owner(&i.to_string());
            registry.begin_timer_request(&o, PendingAction::Shutdown);
            registry.consume_pending_input(&o, "5s").unwrap();
            if i % 2 == 0 {
                registry.cancel_timer(&o).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(h.registry.active_timers(), 8);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.invoker.calls().len(), 8);
    assert_eq!(h.registry.active_timers(), 0);
}
