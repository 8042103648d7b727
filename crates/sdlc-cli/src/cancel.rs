//! Run-wide cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation handle shared by everything taking part in one run.
///
/// Clones share the cancellation flag. A derived context may carry a tighter
/// deadline than its parent; cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancelContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelContext {
    /// Creates a context that is never done until cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a context that is also done once `timeout` elapses.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, deadline) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (parent, child) => parent.or(child),
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    /// Cancels this context and every context sharing its flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once the context is cancelled or its deadline has passed.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True once [`CancelContext::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_clones() {
        let ctx = CancelContext::new();
        let child = ctx.with_timeout(Duration::from_secs(60));
        assert!(!child.is_done());
        ctx.cancel();
        assert!(child.is_done());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_timeout_expires() {
        let ctx = CancelContext::new().with_timeout(Duration::ZERO);
        assert!(ctx.is_done());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_child_deadline_never_extends_parent() {
        let parent = CancelContext::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
