//! Named, cancellable delayed tasks.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::types::RecordingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Hides the "saving" notice once its minimum display time has passed.
    SaveNotice,
    /// Collapses the quick action for incoming recording requests.
    RequestQuickAction,
    /// Lets this participant ask again for a mode after a request.
    RequestCooldown(RecordingMode),
}

/// Delayed tasks keyed by purpose. Scheduling a key replaces the previous
/// task for it; everything is aborted on `cancel_all` or drop.
#[derive(Default)]
pub struct DelayedTasks {
    tasks: Mutex<HashMap<TimerKey, JoinHandle<()>>>,
}

impl DelayedTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, key: TimerKey, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        if let Some(previous) = self.tasks.lock().insert(key, handle) {
            previous.abort();
        }
        debug!("Scheduled {:?} in {:?}", key, delay);
    }

    pub fn cancel(&self, key: TimerKey) -> bool {
        match self.tasks.lock().remove(&key) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: TimerKey) -> bool {
        self.tasks
            .lock()
            .get(&key)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock();
        for (key, handle) in tasks.drain() {
            if !handle.is_finished() {
                debug!("Cancelling {:?}", key);
            }
            handle.abort();
        }
    }
}

impl Drop for DelayedTasks {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_task_fires_after_delay() {
        let timers = DelayedTasks::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        timers.schedule(TimerKey::SaveNotice, Duration::from_secs(2), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timers.is_scheduled(TimerKey::SaveNotice));

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timers.is_scheduled(TimerKey::SaveNotice));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous() {
        let timers = DelayedTasks::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = fired.clone();
            timers.schedule(TimerKey::RequestQuickAction, Duration::from_secs(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_aborts_pending() {
        let timers = DelayedTasks::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for key in [
            TimerKey::SaveNotice,
            TimerKey::RequestQuickAction,
            TimerKey::RequestCooldown(RecordingMode::Transcript),
        ] {
            let counter = fired.clone();
            timers.schedule(key, Duration::from_secs(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(timers.cancel(TimerKey::SaveNotice));
        assert!(!timers.cancel(TimerKey::SaveNotice));
        timers.cancel_all();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
