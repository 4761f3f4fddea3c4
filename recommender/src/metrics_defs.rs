//! Metrics definitions for the recommendation client.

use shared::metrics_defs::{MetricDef, MetricType};

pub const RECOMMENDATION_FETCH_FAILURE: MetricDef = MetricDef {
    name: "recommendations.fetch.failure",
    metric_type: MetricType::Counter,
    description: "Number of recommendation fetches that fell back to the default block",
};

pub const RECOMMENDATION_FETCH_DURATION: MetricDef = MetricDef {
    name: "recommendations.fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch a recommendation block in seconds",
};

pub const RECOMMENDATION_ITEMS: MetricDef = MetricDef {
    name: "recommendations.items",
    metric_type: MetricType::Histogram,
    description: "Number of products returned per recommendation block",
};

pub const ALL_METRICS: &[MetricDef] = &[
    RECOMMENDATION_FETCH_FAILURE,
    RECOMMENDATION_FETCH_DURATION,
    RECOMMENDATION_ITEMS,
];
