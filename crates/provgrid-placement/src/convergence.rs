//! Convergence check on observed counts.
//!
//! The verifier does not demand the exact distribution `evaluate` would
//! produce: any observed state satisfying the mode's invariant counts as
//! converged. FIXED needs every node at `min(cap, desired)`; DYNAMIC
//! needs the total at the global target with every node under the cap.

use std::fmt;

use provgrid_core::{Cap, ClusterSnapshot, ProvisionType, ServiceSpec};

use crate::error::PlacementResult;
use crate::evaluator::{global_target, validate};

/// Outcome of a convergence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub converged: bool,
    /// What the check was looking for.
    pub expectation: String,
    /// Counts seen, in node order.
    pub observed: Vec<u32>,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; observed {:?}", self.expectation, self.observed)
    }
}

/// Check whether `snapshot` satisfies `spec`.
///
/// A snapshot with no nodes is never converged: there is nothing the
/// evaluator could have placed.
pub fn check_convergence(snapshot: &ClusterSnapshot, spec: &ServiceSpec) -> PlacementResult<Verdict> {
    let (desired, cap) = validate(spec)?;
    let observed = snapshot.counts();

    if snapshot.is_empty() {
        return Ok(Verdict {
            converged: false,
            expectation: "at least one node".to_string(),
            observed,
        });
    }

    let (converged, expectation) = match spec.mode {
        ProvisionType::Fixed => {
            let expected = cap.clamp(desired);
            (
                observed.iter().all(|&c| c == expected),
                format!("# of services on each node == {expected}"),
            )
        }
        ProvisionType::Dynamic => {
            let expected = global_target(desired, cap, snapshot.len());
            let within_cap = observed.iter().all(|&c| cap.admits(c));
            let expectation = match cap {
                Cap::Bounded(max) => format!(
                    "# of services == {expected} and # of services on each node <= {max}"
                ),
                Cap::Unbounded => format!("# of services == {expected}"),
            };
            (snapshot.total() == u64::from(expected) && within_cap, expectation)
        }
    };

    Ok(Verdict {
        converged,
        expectation,
        observed,
    })
}
