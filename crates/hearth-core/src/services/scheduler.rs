use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Handle for background work started by plugins.
///
/// Every task is tracked so the host can cancel and drain them on shutdown.
/// Cloning the handle is cheap; all clones share the same task set.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tracker: TaskTracker,
    token: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler with no tasks.
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            token: CancellationToken::new(),
        }
    }

    /// Runs `task` in the background until it completes or the scheduler
    /// shuts down.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = task => {}
            }
        })
    }

    /// Runs `task` after `delay`, unless the scheduler shuts down first.
    pub fn spawn_after<F>(&self, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        })
    }

    /// Number of tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels every pending task and waits for all of them to finish.
    pub async fn shutdown(&self) {
        debug!(tasks = self.tracker.len(), "Shutting down scheduler");
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_spawned_task_runs() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        scheduler
            .spawn(async move {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_delayed_tasks() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        scheduler.spawn_after(Duration::from_secs(3600), async move {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(scheduler.active_tasks(), 1);

        scheduler.shutdown().await;

        assert!(scheduler.is_shutdown());
        assert_eq!(scheduler.active_tasks(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
