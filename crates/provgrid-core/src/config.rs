//! provgrid.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ProvisionType, ServiceDescriptor, ServiceSpec};

const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvgridConfig {
    pub service: ServiceDescriptor,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Worker nodes known at startup.
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlConfig {
    pub tick_interval_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl ControlConfig {
    /// Control loop period, 1s when unset.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS))
    }

    /// Convergence poll period, 1s when unset.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    /// Convergence budget, 60s when unset.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

impl ProvgridConfig {
    /// Load and validate a `provgrid.toml`.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ProvgridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render back to TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The service spec described by the `[service]` table.
    pub fn service_spec(&self) -> ServiceSpec {
        ServiceSpec::from(self.service.clone())
    }

    /// Structural checks only. Count validation happens in the evaluator.
    fn validate(&self) -> ConfigResult<()> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::Invalid("service name is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for node in &self.cluster.nodes {
            if !seen.insert(node.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate node id: {node}")));
            }
        }

        for (field, value) in [
            ("tick_interval_ms", self.control.tick_interval_ms),
            ("poll_interval_ms", self.control.poll_interval_ms),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
            }
        }

        Ok(())
    }

    /// Scaffold a minimal provgrid.toml for a dynamically provisioned service.
    pub fn scaffold(name: &str, nodes: &[&str]) -> Self {
        ProvgridConfig {
            service: ServiceDescriptor {
                name: name.to_string(),
                planned_instance_count: 1,
                max_per_machine: -1,
                provision_type: ProvisionType::Dynamic,
            },
            cluster: ClusterConfig {
                nodes: nodes.iter().map(|n| n.to_string()).collect(),
            },
            control: ControlConfig {
                tick_interval_ms: Some(DEFAULT_TICK_INTERVAL_MS),
                poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
                timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal() {
        let config = ProvgridConfig::from_toml_str(
            r#"
[service]
name = "simple"
plannedInstanceCount = 2
"#,
        )
        .unwrap();

        assert_eq!(config.service.name, "simple");
        assert!(config.cluster.nodes.is_empty());
        assert_eq!(config.control.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.control.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_full() {
        let config = ProvgridConfig::from_toml_str(
            r#"
[service]
name = "simple"
plannedInstanceCount = 10
maxPerMachine = 5
provisionType = "DYNAMIC"

[cluster]
nodes = ["node-a", "node-b", "node-c"]

[control]
tick_interval_ms = 100
poll_interval_ms = 50
timeout_ms = 5000
"#,
        )
        .unwrap();

        let spec = config.service_spec();
        assert_eq!(spec.desired_count, 10);
        assert_eq!(spec.max_per_node, 5);
        assert_eq!(config.cluster.nodes.len(), 3);
        assert_eq!(config.control.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_rejects_duplicate_nodes() {
        let err = ProvgridConfig::from_toml_str(
            r#"
[service]
name = "simple"
plannedInstanceCount = 1

[cluster]
nodes = ["node-a", "node-a"]
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("node-a")));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let err = ProvgridConfig::from_toml_str(
            r#"
[service]
name = "simple"
plannedInstanceCount = 1

[control]
poll_interval_ms = 0
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_scaffold_round_trips_through_file() {
        let config = ProvgridConfig::scaffold("simple", &["node-a", "node-b"]);
        let rendered = config.to_toml_string().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();

        let loaded = ProvgridConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.service, config.service);
        assert_eq!(loaded.cluster.nodes, vec!["node-a", "node-b"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ProvgridConfig::from_file(Path::new("/nonexistent/provgrid.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
