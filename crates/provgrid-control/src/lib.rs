//! provgrid-control - drives a service towards its target distribution.
//!
//! Each tick takes a fresh registry snapshot, evaluates the placement
//! policy and hands the resulting deltas to an [`Actuator`]. Nothing is
//! assumed to take effect immediately: the actuator's work only shows up
//! once counts are reported back to the registry, and the next tick
//! re-evaluates from scratch.
//!
//! # Architecture
//!
//! ```text
//! ControlLoop (one per service)
//!   ├── NodeRegistry   (snapshot per tick)
//!   ├── evaluate()     (FIXED / DYNAMIC policy)
//!   └── Actuator       (applies deltas, reports counts)
//!
//! PlacementCondition ──▶ Waiter (observes convergence from outside)
//! ```

pub mod actuator;
pub mod condition;
pub mod control_loop;
pub mod error;

pub use actuator::{Actuator, BoxFuture, RegistryActuator};
pub use condition::PlacementCondition;
pub use control_loop::{ControlLoop, ControlLoopBuilder, TickOutcome};
pub use error::{ControlError, ControlResult};
