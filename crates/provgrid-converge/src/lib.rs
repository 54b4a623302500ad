//! provgrid-converge - wait for an eventually consistent condition.
//!
//! The control loop and external verifiers use a [`Waiter`] to observe
//! convergence: a predicate is polled at a fixed cadence until it holds,
//! the time budget runs out, or a [`CancelToken`] fires.
//!
//! ```text
//! test() ──true──▶ Converged
//!   │false
//!   ▼
//! describe() → last
//! sleep(min(poll, remaining)) ──cancelled──▶ Cancelled { last }
//!   │
//!   ▼
//! deadline passed? ──yes──▶ Timeout { waited, last }
//!   │no
//!   └──▶ test() ...
//! ```

pub mod cancel;
pub mod error;
pub mod waiter;

pub use cancel::CancelToken;
pub use error::{WaitError, WaitResult};
pub use waiter::{Condition, Converged, FnCondition, Waiter, condition, wait_for};
