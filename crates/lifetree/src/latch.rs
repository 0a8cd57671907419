//! # Latched Broadcast Events
//!
//! A [`Latch`] is a one-shot, broadcast-style event: it starts lowered, can be
//! raised exactly once, and once raised it stays raised forever. Any number of
//! tasks can await it, before or after the raise.
//!
//! The three shutdown phases of a [`Scope`](crate::Scope) (*dying*, *dead*,
//! *done*) are each a `Latch`. The raw latches are exposed so callers can
//! compose phase observation with other signals in a `tokio::select!`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A one-shot event that any number of tasks can observe.
///
/// Cloning a `Latch` is cheap and yields another handle to the same event.
/// Raising is idempotent: only the first call transitions the state.
#[derive(Clone, Default)]
pub struct Latch {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    raised: AtomicBool,
    notify: Notify,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the latch, waking every current waiter. Idempotent.
    pub fn raise(&self) {
        if !self.inner.raised.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once the latch has been raised.
    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    /// Waits until the latch is raised. Returns immediately if it already is.
    pub async fn wait(&self) {
        if self.is_raised() {
            return;
        }
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        loop {
            // Register with the Notify before re-checking the flag, so a raise
            // that lands between the check and the await is not lost.
            notified.as_mut().enable();
            if self.is_raised() {
                return;
            }
            notified.as_mut().await;
            if self.is_raised() {
                return;
            }
            notified.set(self.inner.notify.notified());
        }
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latch")
            .field("raised", &self.is_raised())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn wait_returns_immediately_when_already_raised() {
        let latch = Latch::new();
        latch.raise();
        timeout(Duration::from_secs(1), latch.wait())
            .await
            .expect("wait should not block on a raised latch");
    }

    #[tokio::test]
    async fn raise_wakes_a_pending_waiter() {
        let latch = Latch::new();
        let waiter = tokio::spawn({
            let latch = latch.clone();
            async move { latch.wait().await }
        });
        tokio::task::yield_now().await;
        assert!(!latch.is_raised());
        latch.raise();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .expect("waiter should not panic");
    }

    #[tokio::test]
    async fn raise_is_idempotent_and_sticky() {
        let latch = Latch::new();
        latch.raise();
        latch.raise();
        assert!(latch.is_raised());
        latch.wait().await;
        assert!(latch.is_raised());
    }
}
