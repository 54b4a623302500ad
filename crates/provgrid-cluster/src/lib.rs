//! provgrid-cluster - tracks which worker nodes run a service and how
//! many instances each one reports.
//!
//! # Components
//!
//! - **`registry`** - `NodeRegistry`, the authoritative per-service view
//! - **`feed`** - membership events and the task that applies them
//!
//! ```text
//! membership feed ──join/leave──┐
//!                               ├──▶ NodeRegistry ──snapshot()──▶ evaluator
//! actuator ──────count reports──┘
//! ```

pub mod error;
pub mod feed;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use feed::{MembershipEvent, run_feed};
pub use registry::NodeRegistry;
