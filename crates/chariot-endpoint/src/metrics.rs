//! Metric declarations for the endpoint.
//!
//! Every metric the endpoint records is declared here as a [`Metric`] constant,
//! so names are never spelled twice. Call [`describe_metrics`] once after
//! installing a recorder. Without a recorder the `metrics` facade is a no-op.
//!
//! ```rust
//! use chariot_endpoint::metrics::{metric_defs, MetricKind};
//!
//! assert_eq!(metric_defs::EVENTS_PUBLISHED.kind, MetricKind::Counter);
//! metrics::counter!(metric_defs::EVENTS_PUBLISHED.name).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
}

/// A metric declaration. Every endpoint metric counts something, so the unit
/// is always [`Unit::Count`].
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name.
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Declare a counter.
    pub const fn counter(name: &'static str, description: &'static str) -> Self {
        Metric {
            name,
            kind: MetricKind::Counter,
            description,
            labels: &[],
        }
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str, description: &'static str) -> Self {
        Metric {
            name,
            kind: MetricKind::Gauge,
            description,
            labels: &[],
        }
    }

    /// Attach the label keys recorded with this metric.
    pub const fn labelled(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, Unit::Count, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, Unit::Count, self.description),
        }
    }
}

/// All metric definitions for the endpoint.
pub mod metric_defs {
    use super::Metric;

    /// Resources confirmed by the peer.
    pub const RESOURCES_CREATED: Metric =
        Metric::counter("chariot.resources.created", "Resources confirmed by the peer");

    /// Resource count currently held by the registry.
    pub const RESOURCES_REGISTERED: Metric =
        Metric::gauge("chariot.resources.registered", "Resources held by the registry");

    /// Event records confirmed by the peer.
    pub const EVENTS_PUBLISHED: Metric =
        Metric::counter("chariot.events.published", "Event records confirmed by the peer");

    /// Response waits that ran out of idle polls.
    pub const RESPONSE_TIMEOUTS: Metric =
        Metric::counter("chariot.responses.timeouts", "Response waits that timed out");

    /// Responses carrying a non-success status.
    pub const RESPONSES_REJECTED: Metric =
        Metric::counter("chariot.responses.rejected", "Responses with a non-success status");

    /// Inbound commands dispatched.
    ///
    /// Labels: kind (`pin`, `put`)
    pub const COMMANDS_ROUTED: Metric =
        Metric::counter("chariot.commands.routed", "Inbound commands dispatched")
            .labelled(&["kind"]);

    /// Inbound lines dropped as malformed or unrecognized.
    pub const COMMANDS_DROPPED: Metric =
        Metric::counter("chariot.commands.dropped", "Inbound lines dropped without reply");

    /// Every metric above.
    pub const ALL: &[Metric] = &[
        RESOURCES_CREATED,
        RESOURCES_REGISTERED,
        EVENTS_PUBLISHED,
        RESPONSE_TIMEOUTS,
        RESPONSES_REJECTED,
        COMMANDS_ROUTED,
        COMMANDS_DROPPED,
    ];
}

/// Describe all endpoint metrics to the installed recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_unique() {
        let mut names: Vec<&str> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_metric_metadata() {
        assert_eq!(metric_defs::COMMANDS_ROUTED.labels, &["kind"]);
        assert_eq!(metric_defs::RESOURCES_REGISTERED.kind, MetricKind::Gauge);
        assert!(metric_defs::ALL.iter().all(|m| m.name.starts_with("chariot.")));
        assert!(metric_defs::ALL.iter().all(|m| !m.description.is_empty()));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
