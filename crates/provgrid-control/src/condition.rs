//! Convergence condition over a live registry, for use with a `Waiter`.

use std::sync::Arc;

use provgrid_cluster::NodeRegistry;
use provgrid_converge::Condition;
use provgrid_core::ServiceSpec;
use provgrid_placement::{Verdict, check_convergence};

/// Holds when the registry's observed counts satisfy the spec's
/// placement invariant.
///
/// Each `test` takes one snapshot and keeps the verdict, so `describe`
/// reports exactly the state that was judged.
pub struct PlacementCondition {
    registry: Arc<NodeRegistry>,
    spec: ServiceSpec,
    last: Option<Result<Verdict, String>>,
}

impl PlacementCondition {
    /// Watch `registry` for a layout that satisfies `spec`.
    pub fn new(registry: Arc<NodeRegistry>, spec: ServiceSpec) -> Self {
        Self {
            registry,
            spec,
            last: None,
        }
    }

    /// Verdict from the latest check, if any.
    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last.as_ref().and_then(|v| v.as_ref().ok())
    }
}

impl Condition for PlacementCondition {
    fn test(&mut self) -> bool {
        let snapshot = self.registry.snapshot();
        let verdict = check_convergence(&snapshot, &self.spec).map_err(|e| e.to_string());
        let converged = matches!(&verdict, Ok(v) if v.converged);
        self.last = Some(verdict);
        converged
    }

    fn describe(&self) -> String {
        match &self.last {
            Some(Ok(verdict)) => format!("{}: {verdict}", self.spec.name),
            Some(Err(e)) => format!("{}: {e}", self.spec.name),
            None => format!("{}: not checked yet", self.spec.name),
        }
    }
}
