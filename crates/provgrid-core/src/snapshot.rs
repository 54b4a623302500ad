//! Point-in-time view of the nodes running a service.

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// One worker node and the instances it currently reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,
    pub current_count: u32,
}

impl NodeEntry {
    /// Create an entry for `id` reporting `current_count` instances.
    pub fn new(id: impl Into<NodeId>, current_count: u32) -> Self {
        Self {
            id: id.into(),
            current_count,
        }
    }
}

/// Read-only copy of the registry, ordered by node id.
///
/// Produced fresh for every evaluation and never mutated afterwards.
/// Deserialized snapshots go through [`ClusterSnapshot::new`] so the
/// ordering and uniqueness of ids always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClusterSnapshot")]
pub struct ClusterSnapshot {
    service: String,
    /// Registry mutation counter at the time the copy was taken.
    generation: u64,
    nodes: Vec<NodeEntry>,
}

/// Wire shape of a snapshot before normalisation.
#[derive(Deserialize)]
struct RawClusterSnapshot {
    service: String,
    #[serde(default)]
    generation: u64,
    #[serde(default)]
    nodes: Vec<NodeEntry>,
}

impl From<RawClusterSnapshot> for ClusterSnapshot {
    fn from(raw: RawClusterSnapshot) -> Self {
        Self::new(raw.service, raw.generation, raw.nodes)
    }
}

impl ClusterSnapshot {
    /// Build a snapshot from arbitrary entries. Entries are sorted by id;
    /// for duplicate ids the last entry wins.
    pub fn new(service: impl Into<String>, generation: u64, nodes: Vec<NodeEntry>) -> Self {
        let mut nodes = nodes;
        nodes.reverse();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes.dedup_by(|later, earlier| later.id == earlier.id);
        Self {
            service: service.into(),
            generation,
            nodes,
        }
    }

    /// Snapshot of idle nodes with the given ids.
    pub fn idle<I, S>(service: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let nodes = ids.into_iter().map(|id| NodeEntry::new(id, 0)).collect();
        Self::new(service, 0, nodes)
    }

    /// Name of the service the snapshot was taken for.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Entries in ascending id order, one per node.
    pub fn nodes(&self) -> &[NodeEntry] {
        &self.nodes
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current count reported by `node_id`, if it is present.
    pub fn count(&self, node_id: &str) -> Option<u32> {
        self.nodes
            .binary_search_by(|n| n.id.as_str().cmp(node_id))
            .ok()
            .map(|idx| self.nodes[idx].current_count)
    }

    /// Sum of all reported counts.
    pub fn total(&self) -> u64 {
        self.nodes.iter().map(|n| u64::from(n.current_count)).sum()
    }

    /// Reported counts in node order.
    pub fn counts(&self) -> Vec<u32> {
        self.nodes.iter().map(|n| n.current_count).collect()
    }
}
