//! Sink Registry
//!
//! Resolves which sinks apply to a route and the target each one uses.
//! Built once from the blueprint; lookups never fail, a disabled or
//! unrouted sink is simply absent.

use std::collections::{BTreeSet, HashMap};

use contracts::{RelayBlueprint, ResolvedSink, RouteKey, SinkKind};

/// Target used by the log sink, which has no per-route destination
pub const LOG_TARGET: &str = "tracing";

/// Immutable route table
#[derive(Debug, Clone, Default)]
pub struct SinkRegistry {
    routes: HashMap<RouteKey, Vec<ResolvedSink>>,
}

impl SinkRegistry {
    pub fn from_blueprint(blueprint: &RelayBlueprint) -> Self {
        let routes = RouteKey::all()
            .into_iter()
            .map(|key| (key, Self::resolve(blueprint, key)))
            .filter(|(_, sinks)| !sinks.is_empty())
            .collect();

        Self { routes }
    }

    /// Build from explicit routes
    pub fn from_routes(routes: impl IntoIterator<Item = (RouteKey, ResolvedSink)>) -> Self {
        let mut map: HashMap<RouteKey, Vec<ResolvedSink>> = HashMap::new();
        for (key, sink) in routes {
            map.entry(key).or_default().push(sink);
        }
        Self { routes: map }
    }

    fn resolve(bp: &RelayBlueprint, key: RouteKey) -> Vec<ResolvedSink> {
        let mut sinks = Vec::new();

        if bp.mqtt.enable {
            if let Some(topic) = bp.mqtt.topic_for(key) {
                sinks.push(ResolvedSink::new(SinkKind::Broker, topic));
            }
        }

        let slack_hook = bp.slack.webhook_url.as_deref().is_some_and(|u| !u.is_empty());
        if bp.slack.enable && slack_hook {
            if let Some(channel) = bp.slack.channel_for(key) {
                sinks.push(ResolvedSink::new(SinkKind::Slack, channel));
            }
        }

        if bp.teams.enable {
            if let Some(url) = bp.teams.webhook_for(key) {
                sinks.push(ResolvedSink::new(SinkKind::Teams, url));
            }
        }

        if bp.new_relic.enable {
            if let Some(event_type) = bp.new_relic.event_type_for(key) {
                sinks.push(ResolvedSink::new(SinkKind::NewRelic, event_type));
            }
        }

        if bp.log_sink.enable {
            sinks.push(ResolvedSink::new(SinkKind::Log, LOG_TARGET));
        }

        sinks
    }

    /// Sinks that apply to `key`
    pub fn sinks_for(&self, key: RouteKey) -> &[ResolvedSink] {
        self.routes.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sink kinds used by at least one route
    pub fn enabled_kinds(&self) -> BTreeSet<SinkKind> {
        self.routes
            .values()
            .flatten()
            .map(|sink| sink.kind)
            .collect()
    }

    /// Full table in route order, unrouted keys included
    pub fn table(&self) -> Vec<(RouteKey, &[ResolvedSink])> {
        RouteKey::all()
            .into_iter()
            .map(|key| (key, self.sinks_for(key)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
