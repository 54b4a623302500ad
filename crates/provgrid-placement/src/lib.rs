//! provgrid placement policy - computes where service instances should run.
//!
//! This crate decides per-node target counts for a service. It does NOT
//! start or stop anything (that's the actuator behind `provgrid-control`)
//! and it never touches the registry: every call works on a
//! `ClusterSnapshot` value taken by the caller.
//!
//! # Components
//!
//! - **`evaluator`** - `evaluate()`, the FIXED/DYNAMIC policy
//! - **`distribution`** - the target map and the deltas an actuator applies
//! - **`convergence`** - checks observed counts against the policy
//!
//! # Policy
//!
//! ```text
//! cap = max_per_node == -1 ? unbounded : max_per_node
//!
//! FIXED:   target[n] = min(cap, desired)                for every node
//! DYNAMIC: total     = min(cap * nodes, desired)
//!          hand out one unit at a time to the least-loaded node,
//!          ties broken by node id, never exceeding cap
//! ```

pub mod convergence;
pub mod distribution;
pub mod error;
pub mod evaluator;

pub use convergence::{Verdict, check_convergence};
pub use distribution::{Delta, Distribution};
pub use error::{PlacementError, PlacementResult};
pub use evaluator::{evaluate, global_target, validate};
