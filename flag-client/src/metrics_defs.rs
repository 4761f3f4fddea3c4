//! Metrics definitions for the flag provider client.

use shared::metrics_defs::{MetricDef, MetricType};

pub const PROVIDER_START: MetricDef = MetricDef {
    name: "flag_provider.start",
    metric_type: MetricType::Counter,
    description: "Number of flag provider clients started",
};

pub const DECISION_FETCH_FAILURE: MetricDef = MetricDef {
    name: "flag_provider.decision.failure",
    metric_type: MetricType::Counter,
    description: "Number of failed flag assignment fetches",
};

pub const DECISION_FETCH_DURATION: MetricDef = MetricDef {
    name: "flag_provider.decision.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch flag assignments for a visitor in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    PROVIDER_START,
    DECISION_FETCH_FAILURE,
    DECISION_FETCH_DURATION,
];
