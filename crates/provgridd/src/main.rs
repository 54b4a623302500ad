//! provgridd - the provgrid daemon.
//!
//! Two entry points onto the placement engine:
//! - `evaluate` prints the distribution a spec yields on N idle nodes
//! - `simulate` runs the control loop in-process against a configured
//!   cluster and waits for the registry to converge
//!
//! # Usage
//!
//! ```text
//! provgridd evaluate --desired 10 --max-per-node -1 --mode dynamic --nodes 3
//! provgridd simulate --config provgrid.toml --max-step 1
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use provgrid_cluster::NodeRegistry;
use provgrid_control::{ControlLoop, RegistryActuator};
use provgrid_converge::Waiter;
use provgrid_core::{ClusterSnapshot, ProvgridConfig, ProvisionType, ServiceSpec};
use provgrid_placement::evaluate;

#[derive(Parser, Debug)]
#[command(name = "provgridd", about = "provgrid placement daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the target distribution for a spec on idle nodes.
    Evaluate {
        /// Desired instance count (per node for FIXED, total for DYNAMIC).
        #[arg(long, allow_hyphen_values = true)]
        desired: i32,

        /// Per-node ceiling, -1 for unbounded.
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        max_per_node: i32,

        /// Provision type: fixed or dynamic.
        #[arg(long, default_value = "dynamic")]
        mode: ProvisionType,

        /// Number of worker nodes.
        #[arg(long, default_value = "1")]
        nodes: usize,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Run the control loop against the cluster described in a config file.
    Simulate {
        /// Path to provgrid.toml.
        #[arg(long, default_value = "provgrid.toml")]
        config: PathBuf,

        /// Start or stop at most this many instances per node per tick.
        #[arg(long)]
        max_step: Option<u32>,

        /// Emit the final snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,provgrid=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Evaluate {
            desired,
            max_per_node,
            mode,
            nodes,
            json,
        } => run_evaluate(ServiceSpec::new("cli", desired, max_per_node, mode), nodes, json),
        Command::Simulate {
            config,
            max_step,
            json,
        } => run_simulate(config, max_step, json).await,
    }
}

fn run_evaluate(spec: ServiceSpec, nodes: usize, json: bool) -> anyhow::Result<()> {
    let snapshot = ClusterSnapshot::idle(&spec.name, (0..nodes).map(|i| format!("node-{i}")));
    let distribution = evaluate(&snapshot, &spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&distribution)?);
    } else {
        println!("{spec}");
        for (node, target) in distribution.iter() {
            println!("  {node:<12} {target}");
        }
        println!("  {:<12} {}", "total", distribution.total());
    }
    Ok(())
}

async fn run_simulate(path: PathBuf, max_step: Option<u32>, json: bool) -> anyhow::Result<()> {
    let config = ProvgridConfig::from_file(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    let spec = config.service_spec();
    info!(path = %path.display(), %spec, "config loaded");

    let registry = Arc::new(NodeRegistry::with_nodes(
        spec.name.clone(),
        config.cluster.nodes.iter().cloned(),
    ));
    let mut actuator = RegistryActuator::new(registry.clone());
    if let Some(step) = max_step {
        actuator = actuator.with_max_step(step);
    }

    let control = Arc::new(
        ControlLoop::builder(spec, registry.clone(), Arc::new(actuator))
            .tick_interval(config.control.tick_interval())
            .build()?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn({
        let control = control.clone();
        async move { control.run(shutdown_rx).await }
    });

    let waiter = Waiter::new(config.control.poll_interval(), config.control.timeout());
    let cancel = waiter.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling wait");
            cancel.cancel();
        }
    });

    let mut condition = control.condition();
    let outcome = waiter.wait_async(&mut condition).await;

    let _ = shutdown_tx.send(true);
    runner.await?;

    let snapshot = registry.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for node in snapshot.nodes() {
            println!("  {:<12} {}", node.id, node.current_count);
        }
        println!("  {:<12} {}", "total", snapshot.total());
    }

    let converged = outcome?;
    info!(
        elapsed_ms = converged.elapsed.as_millis() as u64,
        polls = converged.polls,
        "converged"
    );
    Ok(())
}
