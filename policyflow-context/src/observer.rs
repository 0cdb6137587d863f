use crate::{Notification, RunSnapshot};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Receives every state change of a run.
///
/// Callbacks run synchronously on the runner's task after each transition,
/// so an observer sees every intermediate state, not just the latest one.
pub trait RunObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &RunSnapshot);

    fn on_notification(&self, _notification: &Notification) {}
}

/// Records every snapshot and notification it receives
#[derive(Debug, Default)]
pub struct HistoryObserver {
    snapshots: Mutex<Vec<RunSnapshot>>,
    notifications: Mutex<Vec<Notification>>,
}

impl HistoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<RunSnapshot> {
        lock(&self.snapshots).clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn last(&self) -> Option<RunSnapshot> {
        lock(&self.snapshots).last().cloned()
    }
}

impl RunObserver for HistoryObserver {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        lock(&self.snapshots).push(snapshot.clone());
    }

    fn on_notification(&self, notification: &Notification) {
        lock(&self.notifications).push(notification.clone());
    }
}

/// Forwards snapshots into a watch channel for consumers that only need the
/// latest state (a progress bar, for instance)
#[derive(Debug)]
pub struct WatchObserver {
    tx: watch::Sender<Option<RunSnapshot>>,
}

impl WatchObserver {
    pub fn new() -> (Self, watch::Receiver<Option<RunSnapshot>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RunSnapshot>> {
        self.tx.subscribe()
    }
}

impl RunObserver for WatchObserver {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        self.tx.send_replace(Some(snapshot.clone()));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlowRun, StepStatus};

    #[test]
    fn test_history_observer_keeps_every_snapshot() {
        let observer = HistoryObserver::new();
        let mut run = FlowRun::new("demo", ["a"]);
        observer.on_snapshot(&run.snapshot());
        run.start_step(0).unwrap();
        observer.on_snapshot(&run.snapshot());
        observer.on_notification(&Notification::success("done"));

        let snapshots = observer.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].statuses(), vec![StepStatus::InProgress]);
        assert_eq!(observer.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_watch_observer_publishes_latest() {
        let (observer, mut rx) = WatchObserver::new();
        assert!(rx.borrow().is_none());

        let mut run = FlowRun::new("demo", ["a"]);
        run.start_step(0).unwrap();
        observer.on_snapshot(&run.snapshot());

        rx.changed().await.unwrap();
        let latest = rx.borrow().clone().unwrap();
        assert_eq!(latest.in_progress(), Some("a"));
    }
}
