//! Actuator seam - whatever actually starts and stops instances.
//!
//! Real deployments dispatch deltas to remote nodes. [`RegistryActuator`]
//! applies them in-process by writing the new counts straight into the
//! registry, which is what the simulator and tests use.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use provgrid_cluster::{NodeRegistry, RegistryError};
use provgrid_placement::Delta;

pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Applies placement deltas for a service.
pub trait Actuator: Send + Sync {
    /// Start or stop instances so each node reaches its delta target.
    fn apply<'a>(&'a self, service: &'a str, deltas: &'a [Delta]) -> BoxFuture<'a>;
}

/// Writes targets directly into a registry.
///
/// With `with_max_step`, at most that many instances are started or
/// stopped per node per call, so convergence takes several ticks.
pub struct RegistryActuator {
    registry: Arc<NodeRegistry>,
    max_step: Option<u32>,
}

impl RegistryActuator {
    /// Actuator that moves each node straight to its target.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            max_step: None,
        }
    }

    /// Limit how far a single call moves each node.
    pub fn with_max_step(mut self, step: u32) -> Self {
        self.max_step = Some(step.max(1));
        self
    }

    fn next_count(&self, delta: &Delta) -> u32 {
        let Some(step) = self.max_step else {
            return delta.target;
        };
        if delta.target > delta.current {
            delta.current.saturating_add(step).min(delta.target)
        } else {
            delta.current.saturating_sub(step).max(delta.target)
        }
    }
}

impl Actuator for RegistryActuator {
    fn apply<'a>(&'a self, service: &'a str, deltas: &'a [Delta]) -> BoxFuture<'a> {
        Box::pin(async move {
            for delta in deltas {
                let count = self.next_count(delta);
                match self.registry.set_count(&delta.node_id, count) {
                    Ok(()) => debug!(
                        %service,
                        node = %delta.node_id,
                        from = delta.current,
                        to = count,
                        target = delta.target,
                        "applied delta"
                    ),
                    // The node left after the snapshot was taken.
                    Err(RegistryError::UnknownNode(node)) => {
                        info!(%service, %node, "node gone, delta dropped");
                    }
                }
            }
            Ok(())
        })
    }
}
