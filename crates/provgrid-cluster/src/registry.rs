//! Node capacity registry.
//!
//! Holds one entry per worker node known for a service, together with the
//! instance count that node last reported. All mutation goes through an
//! internal `RwLock`, so callers share a registry through an `Arc` without
//! any locking of their own.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use provgrid_core::{ClusterSnapshot, NodeEntry, NodeId};

use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Default)]
struct Members {
    /// node id → current instance count. Ordered so snapshots come out
    /// sorted without extra work.
    nodes: BTreeMap<NodeId, u32>,
    /// Bumped on every effective mutation.
    generation: u64,
}

/// Authoritative node view for one service.
#[derive(Debug)]
pub struct NodeRegistry {
    service: String,
    members: RwLock<Members>,
}

impl NodeRegistry {
    /// Create an empty registry for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            members: RwLock::new(Members::default()),
        }
    }

    /// Registry pre-populated with idle nodes.
    pub fn with_nodes<I, S>(service: impl Into<String>, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let registry = Self::new(service);
        for node in nodes {
            registry.join(node);
        }
        registry
    }

    /// Service this registry tracks.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Add a node with a count of zero.
    ///
    /// Returns `false` (and changes nothing) if the node is already known.
    pub fn join(&self, node_id: impl Into<NodeId>) -> bool {
        let node_id = node_id.into();
        let mut members = self.write();
        if members.nodes.contains_key(&node_id) {
            debug!(service = %self.service, node = %node_id, "join ignored, already registered");
            return false;
        }
        members.nodes.insert(node_id.clone(), 0);
        members.generation += 1;
        info!(service = %self.service, node = %node_id, "node joined");
        true
    }

    /// Remove a node. Its count is dropped with it.
    ///
    /// Returns whether the node was registered.
    pub fn leave(&self, node_id: &str) -> bool {
        let mut members = self.write();
        match members.nodes.remove(node_id) {
            Some(count) => {
                members.generation += 1;
                info!(service = %self.service, node = %node_id, dropped = count, "node left");
                true
            }
            None => false,
        }
    }

    /// Record the instance count a node currently runs.
    pub fn set_count(&self, node_id: &str, count: u32) -> RegistryResult<()> {
        let mut members = self.write();
        let slot = members
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| RegistryError::UnknownNode(node_id.to_string()))?;

        if *slot != count {
            let previous = std::mem::replace(slot, count);
            members.generation += 1;
            debug!(service = %self.service, node = %node_id, previous, count, "count updated");
        }
        Ok(())
    }

    /// Current count of a single node.
    pub fn count(&self, node_id: &str) -> Option<u32> {
        self.read().nodes.get(node_id).copied()
    }

    /// Whether `node_id` is currently a member.
    pub fn contains(&self, node_id: &str) -> bool {
        self.read().nodes.contains_key(node_id)
    }

    /// Number of member nodes.
    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().nodes.is_empty()
    }

    /// Mutation counter, bumped on every membership or count change.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Consistent point-in-time copy, taken under a single read lock.
    pub fn snapshot(&self) -> ClusterSnapshot {
        let members = self.read();
        let nodes = members
            .nodes
            .iter()
            .map(|(id, &count)| NodeEntry::new(id.clone(), count))
            .collect();
        ClusterSnapshot::new(self.service.clone(), members.generation, nodes)
    }

    fn read(&self) -> RwLockReadGuard<'_, Members> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Members> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn join_adds_idle_node() {
        let registry = NodeRegistry::new("simple");
        assert!(registry.join("n1"));

        assert_eq!(registry.count("n1"), Some(0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn join_twice_is_noop() {
        let registry = NodeRegistry::new("simple");
        registry.join("n1");
        registry.set_count("n1", 4).unwrap();
        let generation = registry.generation();

        assert!(!registry.join("n1"));
        assert_eq!(registry.count("n1"), Some(4));
        assert_eq!(registry.generation(), generation);
    }

    #[test]
    fn leave_drops_node_and_count() {
        let registry = NodeRegistry::with_nodes("simple", ["n1", "n2"]);
        registry.set_count("n1", 3).unwrap();

        assert!(registry.leave("n1"));
        assert!(!registry.contains("n1"));
        assert_eq!(registry.snapshot().total(), 0);

        assert!(!registry.leave("n1"));
    }

    #[test]
    fn rejoin_starts_from_zero() {
        let registry = NodeRegistry::with_nodes("simple", ["n1"]);
        registry.set_count("n1", 3).unwrap();
        registry.leave("n1");
        registry.join("n1");

        assert_eq!(registry.count("n1"), Some(0));
    }

    #[test]
    fn set_count_unknown_node_fails() {
        let registry = NodeRegistry::new("simple");
        let err = registry.set_count("ghost", 1).unwrap_err();
        assert_eq!(err, RegistryError::UnknownNode("ghost".to_string()));
    }

    #[test]
    fn set_count_same_value_keeps_generation() {
        let registry = NodeRegistry::with_nodes("simple", ["n1"]);
        registry.set_count("n1", 2).unwrap();
        let generation = registry.generation();

        registry.set_count("n1", 2).unwrap();
        assert_eq!(registry.generation(), generation);
    }

    #[test]
    fn snapshot_is_ordered_and_detached() {
        let registry = NodeRegistry::with_nodes("simple", ["n3", "n1", "n2"]);
        registry.set_count("n2", 5).unwrap();

        let snap = registry.snapshot();
        registry.set_count("n2", 1).unwrap();
        registry.leave("n1");

        let ids: Vec<&str> = snap.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
        assert_eq!(snap.count("n2"), Some(5));
        assert_eq!(snap.service(), "simple");
        assert!(snap.generation() < registry.generation());
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let registry = Arc::new(NodeRegistry::new("simple"));
        let mut handles = Vec::new();

        for i in 0..8 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                let node = format!("n{i}");
                registry.join(node.clone());
                for count in 1..=50 {
                    registry.set_count(&node, count).unwrap();
                }
            }));
        }

        for _ in 0..4 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let snap = registry.snapshot();
                    assert!(snap.nodes().windows(2).all(|w| w[0].id < w[1].id));
                    assert!(snap.nodes().iter().all(|n| n.current_count <= 50));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        let snap = registry.snapshot();
        assert_eq!(snap.len(), 8);
        assert_eq!(snap.total(), 8 * 50);
    }
}
