//! Placement policy evaluator.
//!
//! Given a snapshot and a service spec, compute the per-node target
//! counts. Pure: the same inputs always give the same distribution, so a
//! control loop re-evaluating an unchanged cluster never oscillates.

use tracing::debug;

use provgrid_core::{Cap, ClusterSnapshot, ProvisionType, ServiceSpec};

use crate::distribution::Distribution;
use crate::error::{PlacementError, PlacementResult};

/// Check a spec at the evaluator boundary.
///
/// Returns the desired count and effective cap. Only the documented `-1`
/// sentinel is mapped; nothing else is clamped.
pub fn validate(spec: &ServiceSpec) -> PlacementResult<(u32, Cap)> {
    let desired = u32::try_from(spec.desired_count).map_err(|_| {
        PlacementError::InvalidArgument(format!(
            "desired count must be >= 0, got {} for {}",
            spec.desired_count, spec.name
        ))
    })?;
    let cap = spec.cap().ok_or_else(|| {
        PlacementError::InvalidArgument(format!(
            "max per node must be >= -1, got {} for {}",
            spec.max_per_node, spec.name
        ))
    })?;
    Ok((desired, cap))
}

/// Cluster-wide instance count a DYNAMIC spec aims for on `nodes` nodes:
/// `min(cap * nodes, desired)`, with saturating arithmetic.
pub fn global_target(desired: u32, cap: Cap, nodes: usize) -> u32 {
    cap.across(nodes).min(u64::from(desired)) as u32
}

/// Compute the target distribution for `spec` over `snapshot`.
pub fn evaluate(snapshot: &ClusterSnapshot, spec: &ServiceSpec) -> PlacementResult<Distribution> {
    let (desired, cap) = validate(spec)?;

    if snapshot.is_empty() {
        debug!(service = %spec.name, "no eligible nodes to place on");
        return Err(PlacementError::NoEligibleNodes {
            service: spec.name.clone(),
        });
    }

    let distribution = match spec.mode {
        ProvisionType::Fixed => place_fixed(snapshot, desired, cap),
        ProvisionType::Dynamic => place_dynamic(snapshot, desired, cap),
    };

    debug!(
        service = %spec.name,
        mode = %spec.mode,
        nodes = snapshot.len(),
        total = distribution.total(),
        generation = snapshot.generation(),
        "evaluated placement"
    );

    Ok(distribution)
}

/// Every node runs the same number of copies.
fn place_fixed(snapshot: &ClusterSnapshot, desired: u32, cap: Cap) -> Distribution {
    let per_node = cap.clamp(desired);
    snapshot
        .nodes()
        .iter()
        .map(|n| (n.id.clone(), per_node))
        .collect()
}

/// Spread a cluster-wide total, least-loaded first.
///
/// Handing out units one at a time to the node with the fewest, ties
/// going to the earliest node id, fills the nodes round-robin from zero.
/// That is computed directly: every node gets `total / n`, and the first
/// `total % n` nodes in id order get one more. Since `total <= cap * n`
/// no node ever exceeds the cap.
fn place_dynamic(snapshot: &ClusterSnapshot, desired: u32, cap: Cap) -> Distribution {
    let nodes = snapshot.len();
    let total = global_target(desired, cap, nodes);
    let base = total / nodes as u32;
    let extra = (total % nodes as u32) as usize;

    snapshot
        .nodes()
        .iter()
        .enumerate()
        .map(|(idx, n)| {
            let target = base + u32::from(idx < extra);
            debug!(node = %n.id, target, current = n.current_count, "dynamic target");
            (n.id.clone(), target)
        })
        .collect()
}
