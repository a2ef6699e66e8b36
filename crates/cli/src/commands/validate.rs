//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ListenerKind, RelayBlueprint, SinkKind};
use serde::Serialize;
use tracing::info;

use super::{collect_warnings, load_blueprint};
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    udp_enabled: bool,
    udp_host: String,
    task_failure_port: u16,
    session_connection_port: u16,
    sink_timeout_ms: u64,
    enabled_sinks: Vec<&'static str>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &RelayBlueprint) -> ConfigSummary {
    let registry = dispatcher::SinkRegistry::from_blueprint(blueprint);
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        udp_enabled: blueprint.udp.enable,
        udp_host: blueprint.udp.host.clone(),
        task_failure_port: blueprint.udp.port_for(ListenerKind::TaskFailure),
        session_connection_port: blueprint.udp.port_for(ListenerKind::SessionConnection),
        sink_timeout_ms: blueprint.dispatch.sink_timeout_ms,
        enabled_sinks: registry
            .enabled_kinds()
            .into_iter()
            .map(|k: SinkKind| k.as_str())
            .collect(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  UDP: {} (task failure :{}, session :{}){}",
                summary.udp_host,
                summary.task_failure_port,
                summary.session_connection_port,
                if summary.udp_enabled { "" } else { " [disabled]" }
            );
            println!("  Sink timeout: {} ms", summary.sink_timeout_ms);
            println!("  Sinks: {}", summary.enabled_sinks.join(", "));
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(file: &tempfile::NamedTempFile) -> ValidateArgs {
        ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        }
    }

    #[test]
    fn test_valid_config_summary() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r##"
[udp]
host = "127.0.0.1"
task_failure_port = 19998
session_connection_port = 19997

[slack]
enable = true
webhook_url = "https://hooks.slack.com/services/T/B/X"
task_failure_channel = "#alerts"
"##
        )
        .unwrap();

        let result = validate_config(&args_for(&file));
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.task_failure_port, 19998);
        assert!(summary.enabled_sinks.contains(&"slack"));
        assert!(result
            .warnings
            .unwrap()
            .iter()
            .any(|w| w.contains("status_channel")));
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[slack]\nenable = true").unwrap();

        let result = validate_config(&args_for(&file));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("webhook_url"));
        assert!(run_validate(&args_for(&file)).is_err());
    }
}
