//! Threshold event counter.
//!
//! Uses a single `AtomicI64` so concurrent increments and decrements
//! never lose or double-count an update.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// A threshold-crossing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdEvent {
    /// The watched value crossed the bound.
    Breached,
    /// The watched value returned inside the bound.
    Cleared,
}

/// Concurrency-safe tally of threshold events.
#[derive(Debug, Default)]
pub struct ThresholdCounter {
    count: AtomicI64,
}

impl ThresholdCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
        }
    }

    /// Record one event. Returns the updated value.
    pub fn increment(&self) -> i64 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Retract one event. Returns the updated value.
    pub fn decrement(&self) -> i64 {
        self.count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Number of breaches not yet cleared.
    pub fn value(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Apply a notification: breaches count up, clears count down.
    pub fn notify(&self, event: ThresholdEvent) -> i64 {
        match event {
            ThresholdEvent::Breached => self.increment(),
            ThresholdEvent::Cleared => self.decrement(),
        }
    }

    /// Reset to zero, returning the previous value.
    pub fn reset(&self) -> i64 {
        self.count.swap(0, Ordering::SeqCst)
    }
}

/// Feed notifications from `events` into `counter` until the channel
/// closes or `shutdown` fires.
pub async fn run_listener(
    counter: Arc<ThresholdCounter>,
    mut events: mpsc::Receiver<ThresholdEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("threshold listener started");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    info!("threshold channel closed");
                    break;
                };
                let value = counter.notify(event);
                debug!(?event, value, "threshold event recorded");
            }
            _ = shutdown.changed() => {
                info!("threshold listener shutting down");
                break;
            }
        }
    }
}
