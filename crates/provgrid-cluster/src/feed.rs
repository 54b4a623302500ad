//! Membership feed - applies join/leave/count events to a registry.
//!
//! Events arrive from the external discovery layer and from the
//! deployment actuator. The feed is eventually consistent: a count report
//! may race the leave of the same node, so unknown-node reports are
//! logged and skipped rather than stopping the feed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use provgrid_core::NodeId;

use crate::error::RegistryResult;
use crate::registry::NodeRegistry;

/// A change reported by the membership layer or the actuator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MembershipEvent {
    Joined { node_id: NodeId },
    Left { node_id: NodeId },
    CountReported { node_id: NodeId, count: u32 },
}

impl NodeRegistry {
    /// Apply one membership event.
    pub fn apply(&self, event: MembershipEvent) -> RegistryResult<()> {
        match event {
            MembershipEvent::Joined { node_id } => {
                self.join(node_id);
            }
            MembershipEvent::Left { node_id } => {
                self.leave(&node_id);
            }
            MembershipEvent::CountReported { node_id, count } => {
                self.set_count(&node_id, count)?;
            }
        }
        Ok(())
    }
}

/// Apply events from `events` until the channel closes or `shutdown`
/// fires. Returns the number of events applied.
pub async fn run_feed(
    registry: Arc<NodeRegistry>,
    mut events: mpsc::Receiver<MembershipEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    info!(service = %registry.service(), "membership feed started");
    let mut applied = 0;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    info!(service = %registry.service(), applied, "membership feed closed");
                    break;
                };
                match registry.apply(event) {
                    Ok(()) => applied += 1,
                    Err(e) => warn!(
                        service = %registry.service(),
                        error = %e,
                        "skipping membership event"
                    ),
                }
            }
            _ = shutdown.changed() => {
                info!(service = %registry.service(), applied, "membership feed shutting down");
                break;
            }
        }
    }

    applied
}
