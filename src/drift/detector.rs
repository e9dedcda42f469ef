//! Drift detector
//!
//! Holds the reference profile of one monitored model and compares each
//! current dataset against it, feature by feature.

use crate::drift::config::DriftConfig;
use crate::drift::feature_drift::{DriftResult, FeatureDriftAnalyzer};
use crate::drift::profile::{FeatureValues, ReferenceProfile};
use crate::drift::report::DriftReport;
use crate::error::{DriftError, Result};
use crate::monitoring::{
    MetricsSink, NoopMetrics, DRIFT_DETECTED, DRIFT_SCORE, KS_STATISTIC, MODEL_LAST_TRAINED,
    PSI_SCORE,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Data drift detector for one model.
///
/// The reference profile is swapped as a whole: `set_reference` builds the
/// new profile before taking the write lock, and `detect` works on the
/// snapshot it cloned at the start of the call. Both take `&self`, so a
/// detector can be shared behind an `Arc`.
pub struct DriftDetector {
    config: DriftConfig,
    analyzer: FeatureDriftAnalyzer,
    reference: RwLock<Option<Arc<ReferenceProfile>>>,
    metrics: Arc<dyn MetricsSink>,
}

impl DriftDetector {
    /// Create a detector, rejecting an invalid configuration
    pub fn new(config: DriftConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = FeatureDriftAnalyzer::from_config(&config)?;

        Ok(Self {
            config,
            analyzer,
            reference: RwLock::new(None),
            metrics: Arc::new(NoopMetrics),
        })
    }

    /// Report observations to `metrics` instead of discarding them
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// PSI policy threshold for callers; scoring does not use it
    pub fn psi_threshold(&self) -> f64 {
        self.config.psi_threshold
    }

    /// Profile `data` and make it the reference for later detections
    pub fn set_reference(&self, data: &DataFrame) -> Result<()> {
        let profile = ReferenceProfile::from_dataframe(data, self.config.n_bins)?;

        info!(
            model = %self.config.model_name,
            samples = profile.n_samples(),
            features = profile.len(),
            "Reference data set with {} samples, {} features",
            profile.n_samples(),
            profile.len()
        );

        *self.reference.write() = Some(Arc::new(profile));
        Ok(())
    }

    /// Snapshot of the current reference profile
    pub fn reference_profile(&self) -> Option<Arc<ReferenceProfile>> {
        self.reference.read().clone()
    }

    pub fn has_reference(&self) -> bool {
        self.reference.read().is_some()
    }

    /// Compare `current_data` against the reference profile.
    ///
    /// Features missing from `current_data`, unreadable there, or without a
    /// single valid value are skipped with a warning. Any other failure aborts the whole
    /// call; metrics are only emitted once every feature has been analyzed.
    pub fn detect(&self, current_data: &DataFrame) -> Result<DriftReport> {
        let profile = self.reference_profile().ok_or(DriftError::ReferenceNotSet)?;
        let model = self.config.model_name.as_str();

        let mut results: Vec<DriftResult> = Vec::with_capacity(profile.len());
        for feature in profile.features() {
            let column = match current_data.column(&feature.name) {
                Ok(column) => column,
                Err(_) => {
                    warn!(
                        model = %model,
                        feature = %feature.name,
                        "Feature {} not found in current data",
                        feature.name
                    );
                    continue;
                }
            };

            let current = match FeatureValues::from_column(column, feature.kind()) {
                Ok(current) => current,
                Err(err) => {
                    warn!(
                        model = %model,
                        feature = %feature.name,
                        error = %err,
                        "Feature {} cannot be read from current data",
                        feature.name
                    );
                    continue;
                }
            };
            if current.is_empty() {
                warn!(
                    model = %model,
                    feature = %feature.name,
                    "Feature {} has no valid data in current dataset",
                    feature.name
                );
                continue;
            }

            let result = self
                .analyzer
                .analyze(&feature.name, &feature.values, &current, &feature.stats)?;
            debug!(
                model = %model,
                feature = %result.feature,
                drift_score = result.drift_score,
                severity = %result.severity,
                "Feature analyzed"
            );
            results.push(result);
        }

        for result in &results {
            self.emit(result);
        }

        let report = DriftReport::new(model, results, self.analyzer.thresholds());
        info!(
            model = %model,
            analyzed = report.features_analyzed,
            drifted = report.features_drifted,
            overall = report.overall_drift_score,
            status = %report.status,
            "Drift detection completed"
        );

        Ok(report)
    }

    /// Publish the time the monitored model was last trained
    pub fn record_model_trained(&self, trained_at: DateTime<Utc>) {
        let seconds = trained_at.timestamp_millis() as f64 / 1000.0;
        self.metrics
            .set_gauge(MODEL_LAST_TRAINED, &[("model", self.config.model_name.as_str())], seconds);
    }

    fn emit(&self, result: &DriftResult) {
        let labels = [
            ("model", self.config.model_name.as_str()),
            ("feature", result.feature.as_str()),
        ];
        self.metrics.set_gauge(DRIFT_SCORE, &labels, result.drift_score);
        self.metrics.set_gauge(KS_STATISTIC, &labels, result.ks_statistic);
        self.metrics.set_gauge(PSI_SCORE, &labels, result.psi_score);

        if result.is_drifted {
            self.metrics.increment_counter(
                DRIFT_DETECTED,
                &[
                    ("model", self.config.model_name.as_str()),
                    ("feature", result.feature.as_str()),
                    ("severity", result.severity.as_str()),
                ],
            );
        }
    }
}

impl fmt::Debug for DriftDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriftDetector")
            .field("config", &self.config)
            .field("has_reference", &self.has_reference())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::feature_drift::Severity;
    use crate::monitoring::InMemoryMetrics;
    use polars::df;
    use polars::prelude::{Column, NamedFrom, Series};

    fn reference_frame() -> DataFrame {
        df!(
            "a" => (0..100).map(|i| (i % 10) as f64).collect::<Vec<_>>(),
            "b" => (0..100).map(|i| (i % 7) as f64).collect::<Vec<_>>(),
            "c" => (0..100).map(|i| if i % 2 == 0 { "x" } else { "y" }).collect::<Vec<_>>()
        )
        .unwrap()
    }

    #[test]
    fn test_detect_without_reference() {
        let detector = DriftDetector::new(DriftConfig::new("m")).unwrap();
        let err = detector.detect(&reference_frame()).unwrap_err();
        assert!(matches!(err, DriftError::ReferenceNotSet));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = DriftConfig::new("m").with_warning_threshold(0.5);
        assert!(DriftDetector::new(config).is_err());
    }

    #[test]
    fn test_same_data_no_drift() {
        let detector = DriftDetector::new(DriftConfig::new("m")).unwrap();
        detector.set_reference(&reference_frame()).unwrap();

        let report = detector.detect(&reference_frame()).unwrap();

        assert_eq!(report.features_analyzed, 3);
        assert_eq!(report.features_drifted, 0);
        assert!(report.overall_drift_score < 1e-6);
        assert_eq!(report.status, Severity::None);
        let names: Vec<&str> = report.feature_results.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_feature_skipped() {
        let detector = DriftDetector::new(DriftConfig::new("m")).unwrap();
        detector.set_reference(&reference_frame()).unwrap();

        let current = reference_frame().drop("b").unwrap();
        let report = detector.detect(&current).unwrap();

        assert_eq!(report.features_analyzed, 2);
        assert!(report.result("b").is_none());
    }

    #[test]
    fn test_unreadable_feature_skipped() {
        let detector = DriftDetector::new(DriftConfig::new("m")).unwrap();
        detector
            .set_reference(&df!("a" => &[1.0, 2.0, 3.0], "b" => &[4.0, 5.0, 6.0]).unwrap())
            .unwrap();

        let nested = Series::new(
            "b".into(),
            &[
                Series::new("".into(), &[4.0]),
                Series::new("".into(), &[5.0, 6.0]),
                Series::new("".into(), &[7.0]),
            ],
        );
        let current = DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0]),
            nested.into(),
        ])
        .unwrap();

        let report = detector.detect(&current).unwrap();
        assert_eq!(report.features_analyzed, 1);
        assert!(report.result("a").is_some());
        assert!(report.result("b").is_none());
    }

    #[test]
    fn test_metrics_emitted() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let detector = DriftDetector::new(DriftConfig::new("m"))
            .unwrap()
            .with_metrics(metrics.clone());
        detector.set_reference(&reference_frame()).unwrap();

        let shifted = df!(
            "a" => (0..100).map(|i| 100.0 + (i % 10) as f64).collect::<Vec<_>>()
        )
        .unwrap();
        let report = detector.detect(&shifted).unwrap();
        let a = report.result("a").unwrap();

        let labels = [("model", "m"), ("feature", "a")];
        assert_eq!(metrics.gauge(DRIFT_SCORE, &labels), Some(a.drift_score));
        assert_eq!(metrics.gauge(KS_STATISTIC, &labels), Some(a.ks_statistic));
        assert_eq!(metrics.gauge(PSI_SCORE, &labels), Some(a.psi_score));
        let drifted = [("model", "m"), ("feature", "a"), ("severity", "critical")];
        assert_eq!(metrics.counter(DRIFT_DETECTED, &drifted), 1);
        assert_eq!(metrics.gauge(DRIFT_SCORE, &[("model", "m"), ("feature", "b")]), None);
    }

    #[test]
    fn test_record_model_trained() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let detector = DriftDetector::new(DriftConfig::new("m"))
            .unwrap()
            .with_metrics(metrics.clone());

        let trained_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        detector.record_model_trained(trained_at);

        assert_eq!(
            metrics.gauge(MODEL_LAST_TRAINED, &[("model", "m")]),
            Some(1_700_000_000.0)
        );
    }

    #[test]
    fn test_set_reference_replaces_profile() {
        let detector = DriftDetector::new(DriftConfig::new("m")).unwrap();
        detector.set_reference(&reference_frame()).unwrap();
        let first = detector.reference_profile().unwrap();

        detector.set_reference(&df!("z" => &[1.0, 2.0, 3.0]).unwrap()).unwrap();
        let second = detector.reference_profile().unwrap();

        // The earlier snapshot is untouched by the swap
        assert_eq!(first.feature_names(), vec!["a", "b", "c"]);
        assert_eq!(second.feature_names(), vec!["z"]);
    }

    #[test]
    fn test_failed_set_reference_keeps_previous_profile() {
        let detector = DriftDetector::new(DriftConfig::new("m")).unwrap();
        detector.set_reference(&reference_frame()).unwrap();

        assert!(detector.set_reference(&DataFrame::empty()).is_err());
        assert_eq!(detector.reference_profile().unwrap().len(), 3);
    }
}
