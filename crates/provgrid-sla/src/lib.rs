//! provgrid-sla - observable side of the SLA-threshold notification channel.
//!
//! Threshold notifications (a watched metric crossing a configured bound)
//! are tallied by a [`ThresholdCounter`]. A breach increments the tally,
//! a clear decrements it. The counter is lock-free and may be shared
//! across any number of producers.

pub mod counter;

pub use counter::{ThresholdCounter, ThresholdEvent, run_listener};
