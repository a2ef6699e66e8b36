//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ListenerKind, RelayBlueprint};
use dispatcher::SinkRegistry;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    udp_enabled: bool,
    listeners: Vec<ListenerInfo>,
    sink_timeout_ms: u64,
    enabled_sinks: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct ListenerInfo {
    kind: &'static str,
    address: String,
}

#[derive(Serialize)]
struct RouteInfo {
    route: String,
    sinks: Vec<RouteTarget>,
}

#[derive(Serialize)]
struct RouteTarget {
    sink: &'static str,
    target: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args.routes);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint, with_routes: bool) -> ConfigInfo {
    let registry = SinkRegistry::from_blueprint(blueprint);

    let listeners = ListenerKind::ALL
        .into_iter()
        .map(|kind| ListenerInfo {
            kind: kind.as_str(),
            address: format!("{}:{}", blueprint.udp.host, blueprint.udp.port_for(kind)),
        })
        .collect();

    let routes = if with_routes {
        registry
            .table()
            .into_iter()
            .map(|(key, sinks)| RouteInfo {
                route: key.to_string(),
                sinks: sinks
                    .iter()
                    .map(|s| RouteTarget {
                        sink: s.kind.as_str(),
                        target: s.display_target().into_owned(),
                    })
                    .collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        udp_enabled: blueprint.udp.enable,
        listeners,
        sink_timeout_ms: blueprint.dispatch.sink_timeout_ms,
        enabled_sinks: registry
            .enabled_kinds()
            .into_iter()
            .map(|k| k.as_str())
            .collect(),
        routes,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Butler Relay Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!(
        "📡 UDP Listeners{}",
        if info.udp_enabled { "" } else { " (disabled)" }
    );
    for (i, listener) in info.listeners.iter().enumerate() {
        let prefix = if i == info.listeners.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}: {}", prefix, listener.kind, listener.address);
    }

    println!("\n📤 Sinks");
    println!("   ├─ Timeout: {} ms", info.sink_timeout_ms);
    if info.enabled_sinks.is_empty() {
        println!("   └─ Enabled: (none)");
    } else {
        println!("   └─ Enabled: {}", info.enabled_sinks.join(", "));
    }

    if !info.routes.is_empty() {
        println!("\n🔀 Routes ({})", info.routes.len());
        for (i, route) in info.routes.iter().enumerate() {
            let is_last = i == info.routes.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };

            println!("   {} {}", prefix, route.route);
            for (j, target) in route.sinks.iter().enumerate() {
                let target_prefix = if j == route.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {}  {} {} → {}",
                    child_prefix, target_prefix, target.sink, target.target
                );
            }
        }
    }

    println!();
}
