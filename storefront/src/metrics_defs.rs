//! Metrics definitions for the storefront.

use shared::metrics_defs::{MetricDef, MetricType};

pub const PAGE_LOAD: MetricDef = MetricDef {
    name: "page.load",
    metric_type: MetricType::Counter,
    description: "Number of page loads",
};

pub const PAGE_DEGRADED: MetricDef = MetricDef {
    name: "page.degraded",
    metric_type: MetricType::Counter,
    description: "Number of page loads served with the fallback block after an error",
};

pub const PAGE_LOAD_DURATION: MetricDef = MetricDef {
    name: "page.load.duration",
    metric_type: MetricType::Histogram,
    description: "Time to assemble the page view model in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[PAGE_LOAD, PAGE_DEGRADED, PAGE_LOAD_DURATION];
