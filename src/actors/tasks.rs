//! Fire-and-forget task group with in-flight tracking

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    launched: AtomicU64,
    idle: Notify,
}

/// Launches independent tasks without joining them.
///
/// Spawning never blocks on earlier tasks. The number of unfinished tasks is
/// tracked so the scheduler can report it and refuse to pile up more work.
#[derive(Debug, Clone, Default)]
pub struct TaskGroup {
    inner: Arc<Inner>,
}

/// Decrements the in-flight counter when the task finishes, panics or is dropped.
struct InFlightGuard {
    inner: Arc<Inner>,
}

impl InFlightGuard {
    fn new(inner: Arc<Inner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner.launched.fetch_add(1, Ordering::Relaxed);
        Self { inner }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = InFlightGuard::new(self.inner.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Total number of tasks ever launched
    pub fn launched(&self) -> u64 {
        self.inner.launched.load(Ordering::Relaxed)
    }

    /// Resolves once no task is running anymore.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // register before checking, otherwise a wakeup could be missed
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }

            notified.await;
        }
    }
}
