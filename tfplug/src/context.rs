//! Context implementation for request-scoped cancellation and deadlines
//!
//! Every trait method receives a [`Context`]. Long-running work (polling a
//! remote operation, for instance) must observe it so that a deadline set
//! by the host, or an explicit cancel, stops the work between steps.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries cancellation signals and deadlines across async boundaries
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done_tx: watch::Sender<bool>,
    done: watch::Receiver<bool>,
}

impl ContextInner {
    fn new(deadline: Option<Instant>) -> Self {
        let (done_tx, done) = watch::channel(false);
        Self {
            deadline,
            done_tx,
            done,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner::new(None)),
        }
    }

    /// Derive a child context that is cancelled when `timeout` elapses or
    /// when this context is cancelled, whichever comes first. The child
    /// never outlives the parent's own deadline. The watcher task ends as
    /// soon as the child is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent_deadline) = self.inner.deadline {
            deadline = deadline.min(parent_deadline);
        }

        let inner = Arc::new(ContextInner::new(Some(deadline)));
        let child: Weak<ContextInner> = Arc::downgrade(&inner);
        let mut child_done = inner.done.clone();
        let parent = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent.cancelled() => {}
                // child dropped or cancelled on its own
                _ = child_done.changed() => return,
            }
            if let Some(child) = child.upgrade() {
                let _ = child.done_tx.send(true);
            }
        });

        Self { inner }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns a receiver that flips to `true` once work done on behalf of
    /// this context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn child_is_cancelled_with_parent() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(3600));

        parent.cancel();
        child.cancelled().await;

        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_running() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(3600));

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_child_releases_parent() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(2700));
        tokio::task::yield_now().await;
        assert_eq!(Arc::strong_count(&parent.inner), 2);

        drop(child);
        for _ in 0..10 {
            if Arc::strong_count(&parent.inner) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(Arc::strong_count(&parent.inner), 1);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn child_deadline_is_capped_by_parent() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());

        let short = ctx.with_timeout(Duration::from_secs(1));
        let long = short.with_timeout(Duration::from_secs(60));

        assert_eq!(long.deadline(), short.deadline());
    }
}
