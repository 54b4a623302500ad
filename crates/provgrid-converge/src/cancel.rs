//! Cancellation token shared between a waiter and whoever may abort it.
//!
//! Blocking sleeps park on a `Condvar` and async sleeps on a `Notify`, so
//! both wake as soon as `cancel()` is called.

use std::pin::pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
    notify: Notify,
}

/// Cloneable cancellation signal. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self.lock();
        *cancelled = true;
        drop(cancelled);
        self.inner.cond.notify_all();
        self.inner.notify.notify_waiters();
    }

    /// Whether `cancel()` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Block for up to `duration`. Returns `true` if woken by cancellation.
    ///
    /// A duration too large to turn into a deadline blocks until the token
    /// is cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            return self.wait_cancelled();
        };
        let mut cancelled = self.lock();

        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }

        true
    }

    fn wait_cancelled(&self) -> bool {
        let mut cancelled = self.lock();
        while !*cancelled {
            cancelled = self
                .inner
                .cond
                .wait(cancelled)
                .unwrap_or_else(PoisonError::into_inner);
        }
        true
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register before checking so a concurrent cancel() is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
