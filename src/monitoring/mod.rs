//! Monitoring Module
//!
//! Metric sinks the drift detector reports its per-feature observations to.

mod metrics;

pub use metrics::{
    metric_help, InMemoryMetrics, MetricKey, MetricType, MetricsSink, NoopMetrics,
    DRIFT_DETECTED, DRIFT_SCORE, KS_STATISTIC, MODEL_LAST_TRAINED, PSI_SCORE,
};
