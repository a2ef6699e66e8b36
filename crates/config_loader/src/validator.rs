//! Configuration validation
//!
//! Rules:
//! - field-level constraints declared on the blueprint (URLs, ranges)
//! - the two UDP listeners use distinct ports
//! - an enabled sink has its connection data and at least one route
//! - an enabled Teams route has a webhook URL

use contracts::{ContractError, RelayBlueprint, RouteKey, TeamsWebhook};
use validator::Validate;

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_udp_ports(blueprint)?;
    validate_mqtt(blueprint)?;
    validate_slack(blueprint)?;
    validate_teams(blueprint)?;
    validate_new_relic(blueprint)?;
    Ok(())
}

/// Declarative constraints from the blueprint derive
fn validate_fields(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

fn validate_udp_ports(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let udp = &blueprint.udp;
    if udp.enable && udp.task_failure_port == udp.session_connection_port {
        return Err(ContractError::config_validation(
            "udp.task_failure_port / udp.session_connection_port",
            format!(
                "listeners must use distinct ports, both are {}",
                udp.task_failure_port
            ),
        ));
    }
    Ok(())
}

fn validate_mqtt(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mqtt = &blueprint.mqtt;
    if !mqtt.enable {
        return Ok(());
    }
    if !RouteKey::all().into_iter().any(|k| mqtt.topic_for(k).is_some()) {
        return Err(ContractError::config_validation(
            "mqtt.topics",
            "mqtt is enabled but no topic is configured",
        ));
    }
    Ok(())
}

fn validate_slack(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let slack = &blueprint.slack;
    if !slack.enable {
        return Ok(());
    }
    if slack.webhook_url.as_deref().is_none_or(str::is_empty) {
        return Err(ContractError::config_validation(
            "slack.webhook_url",
            "slack is enabled but webhook_url is missing",
        ));
    }
    if !RouteKey::all().into_iter().any(|k| slack.channel_for(k).is_some()) {
        return Err(ContractError::config_validation(
            "slack",
            "slack is enabled but no channel is configured",
        ));
    }
    Ok(())
}

fn validate_teams(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let teams = &blueprint.teams;
    if !teams.enable {
        return Ok(());
    }

    let routes: [(&str, &TeamsWebhook); 3] = [
        ("teams.task_failure", &teams.task_failure),
        ("teams.user_session", &teams.user_session),
        ("teams.listener_status", &teams.listener_status),
    ];

    for (field, hook) in routes {
        if hook.enable && hook.active_url().is_none() {
            return Err(ContractError::config_validation(
                format!("{field}.webhook_url"),
                "route is enabled but webhook_url is missing",
            ));
        }
    }

    if !routes.iter().any(|(_, hook)| hook.enable) {
        return Err(ContractError::config_validation(
            "teams",
            "teams is enabled but no route is enabled",
        ));
    }
    Ok(())
}

fn validate_new_relic(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let nr = &blueprint.new_relic;
    if !nr.enable {
        return Ok(());
    }
    if nr.account_id.is_empty() {
        return Err(ContractError::config_validation(
            "new_relic.account_id",
            "new_relic is enabled but account_id is empty",
        ));
    }
    if nr.insert_api_key.is_empty() {
        return Err(ContractError::config_validation(
            "new_relic.insert_api_key",
            "new_relic is enabled but insert_api_key is empty",
        ));
    }
    if !RouteKey::all()
        .into_iter()
        .any(|k| nr.event_type_for(k).is_some())
    {
        return Err(ContractError::config_validation(
            "new_relic.event_types",
            "new_relic is enabled but no event type is configured",
        ));
    }
    Ok(())
}
