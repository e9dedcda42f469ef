//! Drift Metrics
//!
//! Gauges and counters emitted by the detector. The detector only talks to
//! the [`MetricsSink`] trait; how values leave the process is up to the sink.
//! [`InMemoryMetrics`] keeps every series under a single lock and can render
//! itself in the Prometheus text format.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Per-feature drift score gauge, labels `model`, `feature`
pub const DRIFT_SCORE: &str = "data_drift_score";
/// Per-feature KS statistic gauge, labels `model`, `feature`
pub const KS_STATISTIC: &str = "ks_test_statistic";
/// Per-feature PSI gauge, labels `model`, `feature`
pub const PSI_SCORE: &str = "psi_score";
/// Drift occurrence counter, labels `model`, `feature`, `severity`
pub const DRIFT_DETECTED: &str = "drift_detected_total";
/// Last training time (unix seconds) gauge, label `model`
pub const MODEL_LAST_TRAINED: &str = "model_last_trained_timestamp";

/// Type of metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// Value that can go up or down
    Gauge,
    /// Monotonically increasing count
    Counter,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

/// Help text for the known metric names
pub fn metric_help(name: &str) -> &'static str {
    match name {
        DRIFT_SCORE => "Data drift score for a feature (0-1 scale)",
        KS_STATISTIC => "Kolmogorov-Smirnov test statistic",
        PSI_SCORE => "Population Stability Index score",
        DRIFT_DETECTED => "Number of times drift was detected",
        MODEL_LAST_TRAINED => "Timestamp of when model was last trained",
        _ => "Drift monitor metric",
    }
}

/// Destination for the detector's observations
pub trait MetricsSink: Send + Sync {
    /// Set a gauge to `value`
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64);

    /// Increment a counter by one
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn set_gauge(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}

    fn increment_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}
}

/// Metric name plus label pairs in the order given
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

impl MetricKey {
    pub fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn render_labels(&self) -> String {
        if self.labels.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();
        format!("{{{}}}", pairs.join(","))
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Inner mutable state protected by a single lock
#[derive(Default)]
struct MetricsInner {
    gauges: BTreeMap<MetricKey, f64>,
    counters: BTreeMap<MetricKey, u64>,
}

/// In-process metrics store
#[derive(Default)]
pub struct InMemoryMetrics {
    inner: RwLock<MetricsInner>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gauge value, if it was ever set
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.inner.read().gauges.get(&MetricKey::new(name, labels)).copied()
    }

    /// Current counter value, 0 if it was never incremented
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.inner
            .read()
            .counters
            .get(&MetricKey::new(name, labels))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of a counter across all label sets
    pub fn counter_total(&self, name: &str) -> u64 {
        self.inner
            .read()
            .counters
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Number of distinct series held
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.gauges.len() + inner.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every series in the Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let inner = self.inner.read();
        let mut out = String::new();

        render_family(&mut out, &inner.gauges, MetricType::Gauge, |v| v.to_string());
        render_family(&mut out, &inner.counters, MetricType::Counter, |v| v.to_string());

        out
    }

    /// Drop all series
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.gauges.clear();
        inner.counters.clear();
    }
}

fn render_family<V>(
    out: &mut String,
    series: &BTreeMap<MetricKey, V>,
    metric_type: MetricType,
    format_value: impl Fn(&V) -> String,
) {
    let mut current: Option<&str> = None;
    for (key, value) in series {
        if current != Some(key.name.as_str()) {
            let _ = writeln!(out, "# HELP {} {}", key.name, metric_help(&key.name));
            let _ = writeln!(out, "# TYPE {} {}", key.name, metric_type.as_str());
            current = Some(key.name.as_str());
        }
        let _ = writeln!(out, "{}{} {}", key.name, key.render_labels(), format_value(value));
    }
}

impl MetricsSink for InMemoryMetrics {
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        self.inner.write().gauges.insert(MetricKey::new(name, labels), value);
    }

    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        *self
            .inner
            .write()
            .counters
            .entry(MetricKey::new(name, labels))
            .or_insert(0) += 1;
    }
}
