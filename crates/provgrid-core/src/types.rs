//! Service and capacity types shared by the registry, the evaluator and
//! the control loop.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a worker node.
pub type NodeId = String;

/// Raw `max_per_node` value meaning "no per-node ceiling".
pub const UNBOUNDED: i32 = -1;

// ── Provision type ─────────────────────────────────────────────────

/// How `desired_count` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProvisionType {
    /// `desired_count` copies on every node (daemon/sidecar semantics).
    Fixed,
    /// `desired_count` is a cluster-wide total spread across nodes.
    #[default]
    Dynamic,
}

impl fmt::Display for ProvisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionType::Fixed => f.write_str("FIXED"),
            ProvisionType::Dynamic => f.write_str("DYNAMIC"),
        }
    }
}

impl FromStr for ProvisionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ProvisionType::Fixed),
            "dynamic" => Ok(ProvisionType::Dynamic),
            other => Err(format!("unknown provision type: {other}")),
        }
    }
}

// ── Cap ────────────────────────────────────────────────────────────

/// Effective per-node instance ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cap {
    Bounded(u32),
    Unbounded,
}

impl Cap {
    /// Map a raw `max_per_node` value to a cap.
    ///
    /// `-1` is the unbounded sentinel. Anything below that is not a
    /// valid cap and yields `None`.
    pub fn from_raw(max_per_node: i32) -> Option<Self> {
        match max_per_node {
            UNBOUNDED => Some(Cap::Unbounded),
            n if n >= 0 => Some(Cap::Bounded(n as u32)),
            _ => None,
        }
    }

    /// Clamp `count` to this cap.
    pub fn clamp(self, count: u32) -> u32 {
        match self {
            Cap::Bounded(max) => count.min(max),
            Cap::Unbounded => count,
        }
    }

    /// Whether `count` fits under this cap.
    pub fn admits(self, count: u32) -> bool {
        match self {
            Cap::Bounded(max) => count <= max,
            Cap::Unbounded => true,
        }
    }

    /// Total capacity of `nodes` nodes under this cap, saturating.
    pub fn across(self, nodes: usize) -> u64 {
        match self {
            Cap::Bounded(max) => u64::from(max).saturating_mul(nodes as u64),
            Cap::Unbounded if nodes == 0 => 0,
            Cap::Unbounded => u64::MAX,
        }
    }
}

impl fmt::Display for Cap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cap::Bounded(max) => write!(f, "{max}"),
            Cap::Unbounded => f.write_str("unbounded"),
        }
    }
}

// ── Service spec ───────────────────────────────────────────────────

/// What the control loop is asked to maintain for one service.
///
/// Counts stay signed so malformed descriptors reach the evaluator,
/// which rejects them instead of silently clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub desired_count: i32,
    /// Per-node ceiling; `-1` means unbounded.
    pub max_per_node: i32,
    pub mode: ProvisionType,
}

impl ServiceSpec {
    /// Create a spec. Values are checked later, by the evaluator.
    pub fn new(
        name: impl Into<String>,
        desired_count: i32,
        max_per_node: i32,
        mode: ProvisionType,
    ) -> Self {
        Self {
            name: name.into(),
            desired_count,
            max_per_node,
            mode,
        }
    }

    /// Effective cap, or `None` if `max_per_node` is below the sentinel.
    pub fn cap(&self) -> Option<Cap> {
        Cap::from_raw(self.max_per_node)
    }
}

impl fmt::Display for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cap = match self.cap() {
            Some(cap) => cap.to_string(),
            None => self.max_per_node.to_string(),
        };
        write!(
            f,
            "{} [{} desired={} max_per_node={}]",
            self.name, self.mode, self.desired_count, cap
        )
    }
}

// ── Descriptor record ──────────────────────────────────────────────

/// Service record as produced by the external deployment-descriptor
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    pub planned_instance_count: i32,
    #[serde(default = "default_max_per_machine")]
    pub max_per_machine: i32,
    #[serde(default)]
    pub provision_type: ProvisionType,
}

fn default_max_per_machine() -> i32 {
    UNBOUNDED
}

impl From<ServiceDescriptor> for ServiceSpec {
    fn from(d: ServiceDescriptor) -> Self {
        ServiceSpec {
            name: d.name,
            desired_count: d.planned_instance_count,
            max_per_node: d.max_per_machine,
            mode: d.provision_type,
        }
    }
}

impl From<&ServiceSpec> for ServiceDescriptor {
    fn from(spec: &ServiceSpec) -> Self {
        ServiceDescriptor {
            name: spec.name.clone(),
            planned_instance_count: spec.desired_count,
            max_per_machine: spec.max_per_node,
            provision_type: spec.mode,
        }
    }
}
