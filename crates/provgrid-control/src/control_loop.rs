//! Per-service control loop.
//!
//! Reads a fresh snapshot on every tick and never caches a previous
//! decision: the snapshot may already be stale when the deltas are
//! applied, and a node that joins mid-convergence is simply part of the
//! next snapshot.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use provgrid_cluster::NodeRegistry;
use provgrid_core::ServiceSpec;
use provgrid_placement::{Distribution, PlacementError, evaluate, validate};

use crate::actuator::Actuator;
use crate::condition::PlacementCondition;
use crate::error::{ControlError, ControlResult};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Observed counts already equal the target; nothing dispatched.
    Converged,
    /// Deltas for this many nodes were handed to the actuator.
    Applied { deltas: usize },
    /// The registry has no nodes; retried on the next tick.
    NoEligibleNodes,
}

/// Configures a [`ControlLoop`].
pub struct ControlLoopBuilder {
    spec: ServiceSpec,
    registry: Arc<NodeRegistry>,
    actuator: Arc<dyn Actuator>,
    tick_interval: Duration,
}

impl ControlLoopBuilder {
    /// Time between ticks when driven by [`ControlLoop::run`].
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Finish configuration and run the initialization step.
    pub fn build(self) -> ControlResult<ControlLoop> {
        let control = ControlLoop {
            spec: RwLock::new(self.spec),
            registry: self.registry,
            actuator: self.actuator,
            tick_interval: self.tick_interval,
            last_distribution: Mutex::new(None),
        };
        control.initialize()?;
        Ok(control)
    }
}

/// Drives one service towards the distribution its spec calls for.
pub struct ControlLoop {
    spec: RwLock<ServiceSpec>,
    registry: Arc<NodeRegistry>,
    actuator: Arc<dyn Actuator>,
    tick_interval: Duration,
    last_distribution: Mutex<Option<Distribution>>,
}

impl ControlLoop {
    /// Start configuring a loop for `spec` over `registry`.
    pub fn builder(
        spec: ServiceSpec,
        registry: Arc<NodeRegistry>,
        actuator: Arc<dyn Actuator>,
    ) -> ControlLoopBuilder {
        ControlLoopBuilder {
            spec,
            registry,
            actuator,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Runs once, after every builder setting has been applied.
    fn initialize(&self) -> ControlResult<()> {
        let spec = self.spec();
        self.check_spec(&spec)?;
        if self.tick_interval.is_zero() {
            return Err(ControlError::Config("tick interval must be non-zero".to_string()));
        }

        let snapshot = self.registry.snapshot();
        info!(
            service = %spec.name,
            mode = %spec.mode,
            desired = spec.desired_count,
            max_per_node = spec.max_per_node,
            nodes = snapshot.len(),
            tick_ms = self.tick_interval.as_millis() as u64,
            "control loop initialized"
        );
        Ok(())
    }

    fn check_spec(&self, spec: &ServiceSpec) -> ControlResult<()> {
        validate(spec)?;
        if spec.name != self.registry.service() {
            return Err(ControlError::Config(format!(
                "spec is for service {} but registry tracks {}",
                spec.name,
                self.registry.service()
            )));
        }
        Ok(())
    }

    /// The spec currently being maintained.
    pub fn spec(&self) -> ServiceSpec {
        self.spec
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registry the loop reads snapshots from.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Distribution computed by the most recent successful evaluation.
    pub fn last_distribution(&self) -> Option<Distribution> {
        self.last_distribution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the spec. Takes effect on the next tick.
    pub fn redeploy(&self, spec: ServiceSpec) -> ControlResult<()> {
        self.check_spec(&spec)?;
        info!(service = %spec.name, %spec, "redeployed");
        *self.spec.write().unwrap_or_else(PoisonError::into_inner) = spec;
        Ok(())
    }

    /// Condition that holds once the registry satisfies the current spec.
    pub fn condition(&self) -> PlacementCondition {
        PlacementCondition::new(self.registry.clone(), self.spec())
    }

    /// Snapshot, evaluate, dispatch deltas.
    pub async fn tick(&self) -> ControlResult<TickOutcome> {
        let spec = self.spec();
        let snapshot = self.registry.snapshot();

        let distribution = match evaluate(&snapshot, &spec) {
            Ok(d) => d,
            Err(PlacementError::NoEligibleNodes { service }) => {
                debug!(%service, "no nodes yet, will retry");
                return Ok(TickOutcome::NoEligibleNodes);
            }
            Err(e) => return Err(e.into()),
        };

        let deltas = distribution.deltas(&snapshot);
        *self
            .last_distribution
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(distribution);

        if deltas.is_empty() {
            debug!(service = %spec.name, generation = snapshot.generation(), "converged");
            return Ok(TickOutcome::Converged);
        }

        self.actuator.apply(&spec.name, &deltas).await?;
        info!(
            service = %spec.name,
            nodes = deltas.len(),
            generation = snapshot.generation(),
            "dispatched placement deltas"
        );
        Ok(TickOutcome::Applied {
            deltas: deltas.len(),
        })
    }

    /// Tick periodically until `shutdown` fires. Tick failures are logged
    /// and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let service = self.registry.service().to_string();
        info!(
            %service,
            interval_ms = self.tick_interval.as_millis() as u64,
            "control loop started"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::NoEligibleNodes) => {
                            warn!(%service, "no eligible nodes");
                        }
                        Ok(_) => {}
                        Err(e) => error!(%service, error = %e, "control loop tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!(%service, "control loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use provgrid_core::ProvisionType;
    use provgrid_placement::Delta;

    use crate::actuator::{BoxFuture, RegistryActuator};

    struct FailingActuator;

    impl Actuator for FailingActuator {
        fn apply<'a>(&'a self, _service: &'a str, _deltas: &'a [Delta]) -> BoxFuture<'a> {
            Box::pin(async { Err(anyhow::anyhow!("node unreachable")) })
        }
    }

    #[derive(Default)]
    struct CountingActuator {
        calls: AtomicUsize,
    }

    impl Actuator for CountingActuator {
        fn apply<'a>(&'a self, _service: &'a str, _deltas: &'a [Delta]) -> BoxFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    fn dynamic(desired: i32, max: i32) -> ServiceSpec {
        ServiceSpec::new("simple", desired, max, ProvisionType::Dynamic)
    }

    fn in_process(spec: ServiceSpec, nodes: &[&str]) -> ControlLoop {
        let registry = Arc::new(NodeRegistry::with_nodes("simple", nodes.iter().copied()));
        let actuator = Arc::new(RegistryActuator::new(registry.clone()));
        ControlLoop::builder(spec, registry, actuator).build().unwrap()
    }

    #[test]
    fn build_rejects_invalid_spec() {
        let registry = Arc::new(NodeRegistry::new("simple"));
        let actuator = Arc::new(RegistryActuator::new(registry.clone()));
        let err = ControlLoop::builder(dynamic(-1, 1), registry, actuator)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ControlError::Placement(PlacementError::InvalidArgument(_))));
    }

    #[test]
    fn build_rejects_mismatched_service() {
        let registry = Arc::new(NodeRegistry::new("other"));
        let actuator = Arc::new(RegistryActuator::new(registry.clone()));
        let err = ControlLoop::builder(dynamic(1, 1), registry, actuator)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn build_rejects_zero_tick_interval() {
        let registry = Arc::new(NodeRegistry::new("simple"));
        let actuator = Arc::new(RegistryActuator::new(registry.clone()));
        let err = ControlLoop::builder(dynamic(1, 1), registry, actuator)
            .tick_interval(Duration::ZERO)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[tokio::test]
    async fn tick_applies_then_reports_converged() {
        let control = in_process(dynamic(10, -1), &["a", "b", "c"]);

        assert_eq!(control.tick().await.unwrap(), TickOutcome::Applied { deltas: 3 });
        assert_eq!(control.registry().snapshot().counts(), vec![4, 3, 3]);
        assert_eq!(control.tick().await.unwrap(), TickOutcome::Converged);
        assert_eq!(control.last_distribution().unwrap().total(), 10);
    }

    #[tokio::test]
    async fn tick_without_nodes_is_not_an_error() {
        let control = in_process(dynamic(3, 1), &[]);
        assert_eq!(control.tick().await.unwrap(), TickOutcome::NoEligibleNodes);
        assert!(control.last_distribution().is_none());
    }

    #[tokio::test]
    async fn converged_cluster_does_not_call_actuator() {
        let registry = Arc::new(NodeRegistry::with_nodes("simple", ["a", "b"]));
        registry.set_count("a", 1).unwrap();
        registry.set_count("b", 1).unwrap();
        let actuator = Arc::new(CountingActuator::default());
        let control = ControlLoop::builder(dynamic(2, -1), registry, actuator.clone())
            .build()
            .unwrap();

        for _ in 0..3 {
            assert_eq!(control.tick().await.unwrap(), TickOutcome::Converged);
        }
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn actuator_failure_is_surfaced() {
        let registry = Arc::new(NodeRegistry::with_nodes("simple", ["a"]));
        let control = ControlLoop::builder(dynamic(1, -1), registry, Arc::new(FailingActuator))
            .build()
            .unwrap();

        let err = control.tick().await.unwrap_err();
        assert!(matches!(err, ControlError::Actuator(_)));
        assert!(err.to_string().contains("node unreachable"));
    }

    #[tokio::test]
    async fn redeploy_changes_next_tick() {
        let control = in_process(dynamic(4, -1), &["a", "b"]);
        control.tick().await.unwrap();
        assert_eq!(control.registry().snapshot().total(), 4);

        control
            .redeploy(ServiceSpec::new("simple", 3, 1, ProvisionType::Fixed))
            .unwrap();
        control.tick().await.unwrap();
        assert_eq!(control.registry().snapshot().counts(), vec![1, 1]);
    }

    #[tokio::test]
    async fn redeploy_rejects_invalid_spec_and_keeps_old() {
        let control = in_process(dynamic(4, -1), &["a"]);
        assert!(control.redeploy(dynamic(4, -7)).is_err());
        assert_eq!(control.spec().max_per_node, -1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let registry = Arc::new(NodeRegistry::with_nodes("simple", ["a", "b"]));
        let actuator = Arc::new(RegistryActuator::new(registry.clone()));
        let control = Arc::new(
            ControlLoop::builder(dynamic(6, -1), registry.clone(), actuator)
                .tick_interval(Duration::from_millis(10))
                .build()
                .unwrap(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn({
            let control = control.clone();
            async move { control.run(shutdown_rx).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("run should stop on shutdown")
            .unwrap();

        assert_eq!(registry.snapshot().counts(), vec![3, 3]);
    }
}
