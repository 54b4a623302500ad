//! Budgeted, cancellable polling of a [`Condition`].

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::{WaitError, WaitResult};

/// Lower bound on the poll interval so a zero interval never spins.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A predicate paired with a description of what it is waiting for.
///
/// `describe` is called right after every failed `test`, so the text
/// reported on timeout always matches the state that was last checked.
pub trait Condition {
    fn test(&mut self) -> bool;
    fn describe(&self) -> String;
}

/// [`Condition`] built from two closures.
pub struct FnCondition<P, D> {
    test: P,
    describe: D,
}

/// Pair a predicate with a describer.
pub fn condition<P, D>(test: P, describe: D) -> FnCondition<P, D>
where
    P: FnMut() -> bool,
    D: Fn() -> String,
{
    FnCondition { test, describe }
}

impl<P, D> Condition for FnCondition<P, D>
where
    P: FnMut() -> bool,
    D: Fn() -> String,
{
    fn test(&mut self) -> bool {
        (self.test)()
    }

    fn describe(&self) -> String {
        (self.describe)()
    }
}

/// Successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converged {
    /// Time from the call until the condition held.
    pub elapsed: Duration,
    /// Number of times the predicate was evaluated.
    pub polls: u32,
}

/// Polls conditions with a fixed cadence and budget.
#[derive(Debug, Clone)]
pub struct Waiter {
    poll_interval: Duration,
    timeout: Duration,
    cancel: CancelToken,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT)
    }
}

impl Waiter {
    /// Create a waiter with its own cancel token. A zero `poll_interval`
    /// is raised to one millisecond.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            timeout,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancel token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Time between consecutive checks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Overall budget for one wait.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Token that aborts waits in progress on this waiter.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Block the calling thread until `cond` holds.
    pub fn wait<C: Condition + ?Sized>(&self, cond: &mut C) -> WaitResult<Converged> {
        let start = Instant::now();
        let deadline = start.checked_add(self.timeout);
        let mut polls = 1;

        if cond.test() {
            return Ok(Converged {
                elapsed: start.elapsed(),
                polls,
            });
        }
        let mut last = cond.describe();

        loop {
            let nap = match self.next_nap(deadline) {
                Some(nap) => nap,
                None => return Err(self.timed_out(start, last)),
            };
            if self.cancel.is_cancelled() || self.cancel.sleep(nap) {
                debug!(%last, "wait cancelled");
                return Err(WaitError::Cancelled { last });
            }

            polls += 1;
            if cond.test() {
                let elapsed = start.elapsed();
                debug!(?elapsed, polls, "condition met");
                return Ok(Converged { elapsed, polls });
            }
            last = cond.describe();
        }
    }

    /// Async counterpart of [`Waiter::wait`]. Sleeps on the tokio timer.
    pub async fn wait_async<C: Condition + ?Sized>(&self, cond: &mut C) -> WaitResult<Converged> {
        let start = Instant::now();
        let deadline = start.checked_add(self.timeout);
        let mut polls = 1;

        if cond.test() {
            return Ok(Converged {
                elapsed: start.elapsed(),
                polls,
            });
        }
        let mut last = cond.describe();

        loop {
            let nap = match self.next_nap(deadline) {
                Some(nap) => nap,
                None => return Err(self.timed_out(start, last)),
            };
            if self.cancel.is_cancelled() {
                return Err(WaitError::Cancelled { last });
            }
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = self.cancel.cancelled() => {
                    debug!(%last, "wait cancelled");
                    return Err(WaitError::Cancelled { last });
                }
            }

            polls += 1;
            if cond.test() {
                let elapsed = start.elapsed();
                debug!(?elapsed, polls, "condition met");
                return Ok(Converged { elapsed, polls });
            }
            last = cond.describe();
        }
    }

    /// Time to sleep before the next check, truncated to the deadline.
    /// `None` once the deadline has passed.
    fn next_nap(&self, deadline: Option<Instant>) -> Option<Duration> {
        let Some(deadline) = deadline else {
            return Some(self.poll_interval);
        };
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        Some(self.poll_interval.min(deadline - now))
    }

    fn timed_out(&self, start: Instant, last: String) -> WaitError {
        let waited = start.elapsed();
        warn!(?waited, timeout = ?self.timeout, %last, "condition not met before timeout");
        WaitError::Timeout { waited, last }
    }
}

/// Poll `predicate` every `poll_interval` until it holds or `timeout`
/// elapses.
pub fn wait_for<P, D>(
    predicate: P,
    describe: D,
    poll_interval: Duration,
    timeout: Duration,
) -> WaitResult<Converged>
where
    P: FnMut() -> bool,
    D: Fn() -> String,
{
    Waiter::new(poll_interval, timeout).wait(&mut condition(predicate, describe))
}
