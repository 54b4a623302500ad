//! Target distribution and the per-node deltas derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use provgrid_core::{ClusterSnapshot, NodeId};

/// Node id → target instance count, ordered by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution {
    targets: BTreeMap<NodeId, u32>,
}

/// Change an actuator has to make on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub node_id: NodeId,
    pub current: u32,
    pub target: u32,
}

impl Delta {
    /// Instances to start (positive) or stop (negative).
    pub fn change(&self) -> i64 {
        i64::from(self.target) - i64::from(self.current)
    }
}

impl Distribution {
    /// Target for `node_id`, if the node was part of the evaluation.
    pub fn get(&self, node_id: &str) -> Option<u32> {
        self.targets.get(node_id).copied()
    }

    /// Number of nodes with a target.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Sum of all targets.
    pub fn total(&self) -> u64 {
        self.targets.values().map(|&t| u64::from(t)).sum()
    }

    /// `(node id, target)` pairs in node order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.targets.iter().map(|(id, &t)| (id.as_str(), t))
    }

    /// Targets in node order.
    pub fn values(&self) -> Vec<u32> {
        self.targets.values().copied().collect()
    }

    /// Whether `snapshot` holds exactly these nodes at exactly these counts.
    pub fn matches(&self, snapshot: &ClusterSnapshot) -> bool {
        snapshot.len() == self.targets.len()
            && snapshot
                .nodes()
                .iter()
                .all(|n| self.get(&n.id) == Some(n.current_count))
    }

    /// Nodes of `snapshot` whose count differs from their target, in node
    /// order. Nodes without a target (joined after this distribution was
    /// computed) are left alone until the next evaluation.
    pub fn deltas(&self, snapshot: &ClusterSnapshot) -> Vec<Delta> {
        snapshot
            .nodes()
            .iter()
            .filter_map(|n| {
                let target = self.get(&n.id)?;
                (target != n.current_count).then(|| Delta {
                    node_id: n.id.clone(),
                    current: n.current_count,
                    target,
                })
            })
            .collect()
    }
}

impl FromIterator<(NodeId, u32)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (NodeId, u32)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}
