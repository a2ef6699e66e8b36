//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{ListenerKind, RelayBlueprint};
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::relay::{Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if apply_overrides(&mut blueprint, args) {
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Configuration invalid after command-line overrides")?;
    }

    info!(
        udp_enabled = blueprint.udp.enable,
        host = %blueprint.udp.host,
        task_failure_port = blueprint.udp.port_for(ListenerKind::TaskFailure),
        session_port = blueprint.udp.port_for(ListenerKind::SessionConnection),
        "Configuration loaded"
    );

    let relay = Relay::new(RelayConfig {
        blueprint,
        dry_run: args.dry_run,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let stats = relay
        .run(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    info!(
        datagrams = stats.datagrams_received(),
        events = stats.delivery.total_events,
        duration_secs = stats.duration.as_secs_f64(),
        "Relay finished"
    );
    stats.print_summary();

    Ok(())
}

/// Apply command-line overrides; returns true when anything changed
fn apply_overrides(blueprint: &mut RelayBlueprint, args: &RunArgs) -> bool {
    let mut changed = false;
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding UDP host from CLI");
        blueprint.udp.host = host.clone();
        changed = true;
    }
    if let Some(port) = args.task_failure_port {
        info!(port, "Overriding task failure port from CLI");
        blueprint.udp.task_failure_port = port;
        changed = true;
    }
    if let Some(port) = args.session_port {
        info!(port, "Overriding session port from CLI");
        blueprint.udp.session_connection_port = port;
        changed = true;
    }
    changed
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves, so the other one
/// still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, stopping relay..."),
        _ = terminate => warn!("Received SIGTERM, stopping relay..."),
    }
}
