//! Command implementations.

mod emit;
mod info;
mod run;
mod validate;

use std::path::Path;

use contracts::RelayBlueprint;

use crate::error::{CliError, Result};

pub use emit::run_emit;
pub use info::run_info;
pub use run::run_relay;
pub use validate::run_validate;

/// Load and validate a configuration file
fn load_blueprint(path: &Path) -> Result<RelayBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}

/// Non-fatal configuration issues
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.udp.enable {
        warnings.push("udp.enable is false - no datagrams will be received".to_string());
    }

    let registry = dispatcher::SinkRegistry::from_blueprint(blueprint);
    if registry.is_empty() {
        warnings.push("No sink enabled - events will be decoded and dropped".to_string());
    }

    if blueprint.slack.enable && blueprint.slack.status_channel.is_none() {
        warnings.push("slack.status_channel is unset - listener status goes unreported on Slack".to_string());
    }

    warnings
}
