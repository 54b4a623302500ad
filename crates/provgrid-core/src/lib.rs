//! provgrid-core - shared types used across provgrid crates.
//!
//! - **`types`** - `ServiceSpec`, `ProvisionType`, `Cap`, and the
//!   descriptor record handed over by the deployment-descriptor parser
//! - **`snapshot`** - `ClusterSnapshot`, the read-only node view the
//!   evaluator works on
//! - **`config`** - `provgrid.toml` parsing

pub mod config;
pub mod error;
pub mod snapshot;
pub mod types;

pub use config::{ClusterConfig, ControlConfig, ProvgridConfig};
pub use error::{ConfigError, ConfigResult};
pub use snapshot::{ClusterSnapshot, NodeEntry};
pub use types::*;
