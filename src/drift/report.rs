//! Drift report and recommendation text

use crate::drift::feature_drift::{DriftResult, Severity, SeverityThresholds};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one detection run over all reference features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub model_name: String,
    /// UTC time the report was built
    pub timestamp: DateTime<Utc>,
    pub features_analyzed: usize,
    pub features_drifted: usize,
    /// Mean of the per-feature drift scores, 0 when nothing was analyzed
    pub overall_drift_score: f64,
    /// Tier of `overall_drift_score`, the same tier the recommendation uses
    pub status: Severity,
    /// Per-feature results in reference column order
    pub feature_results: Vec<DriftResult>,
    pub recommendation: String,
}

impl DriftReport {
    /// Assemble a report from per-feature results, timestamped now
    pub fn new(
        model_name: impl Into<String>,
        feature_results: Vec<DriftResult>,
        thresholds: SeverityThresholds,
    ) -> Self {
        let features_analyzed = feature_results.len();
        let features_drifted = feature_results.iter().filter(|r| r.is_drifted).count();
        let overall_drift_score = if features_analyzed > 0 {
            feature_results.iter().map(|r| r.drift_score).sum::<f64>() / features_analyzed as f64
        } else {
            0.0
        };
        let recommendation = generate_recommendation(
            features_drifted,
            features_analyzed,
            overall_drift_score,
            thresholds,
        );

        Self {
            model_name: model_name.into(),
            timestamp: Utc::now(),
            features_analyzed,
            features_drifted,
            overall_drift_score,
            status: thresholds.classify(overall_drift_score),
            feature_results,
            recommendation,
        }
    }

    /// Names of drifted features
    pub fn drifted_features(&self) -> Vec<&str> {
        self.feature_results
            .iter()
            .filter(|r| r.is_drifted)
            .map(|r| r.feature.as_str())
            .collect()
    }

    /// Names of features at critical severity
    pub fn critical_features(&self) -> Vec<&str> {
        self.feature_results
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .map(|r| r.feature.as_str())
            .collect()
    }

    /// Names of features whose PSI exceeds `threshold`
    pub fn psi_breaches(&self, threshold: f64) -> Vec<&str> {
        self.feature_results
            .iter()
            .filter(|r| r.psi_score > threshold)
            .map(|r| r.feature.as_str())
            .collect()
    }

    /// Result for `feature`, if it was analyzed
    pub fn result(&self, feature: &str) -> Option<&DriftResult> {
        self.feature_results.iter().find(|r| r.feature == feature)
    }

    /// Generate summary string
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("Drift Report\n");
        s.push_str("============\n");
        s.push_str(&format!("Model: {}\n", self.model_name));
        s.push_str(&format!("Timestamp: {}\n", self.timestamp.to_rfc3339()));
        s.push_str(&format!("Features analyzed: {}\n", self.features_analyzed));
        s.push_str(&format!("Drifted features: {}\n", self.features_drifted));
        s.push_str(&format!("Overall drift score: {:.4}\n\n", self.overall_drift_score));

        if self.features_drifted > 0 {
            s.push_str("Drifted Features:\n");
            for r in self.feature_results.iter().filter(|r| r.is_drifted) {
                s.push_str(&format!(
                    "  - {} [{}] score={:.4}\n",
                    r.feature,
                    r.severity.as_str().to_uppercase(),
                    r.drift_score
                ));
            }
            s.push('\n');
        }

        s.push_str(&self.recommendation);
        s.push('\n');
        s
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Actionable recommendation for an overall drift score.
///
/// Three tiers keyed on the same thresholds as feature severity: CRITICAL
/// asks for immediate retraining, WARNING for scheduled retraining and root
/// cause investigation, OK for continued monitoring.
pub fn generate_recommendation(
    n_drifted: usize,
    n_features: usize,
    overall_score: f64,
    thresholds: SeverityThresholds,
) -> String {
    let drift_percentage = if n_features > 0 {
        n_drifted as f64 / n_features as f64 * 100.0
    } else {
        0.0
    };

    match thresholds.classify(overall_score) {
        Severity::Critical => format!(
            "CRITICAL: Significant drift detected in {}/{} features ({:.1}%). \
             Immediate model retraining recommended. \
             Review feature pipelines for data quality issues.",
            n_drifted, n_features, drift_percentage
        ),
        Severity::Warning => format!(
            "WARNING: Moderate drift detected in {}/{} features ({:.1}%). \
             Schedule model retraining and investigate root causes of drift.",
            n_drifted, n_features, drift_percentage
        ),
        Severity::None => format!(
            "OK: No significant drift detected. {} features analyzed. Continue monitoring.",
            n_features
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::feature_drift::DriftDetails;

    fn result(feature: &str, drift_score: f64, psi_score: f64) -> DriftResult {
        let severity = SeverityThresholds::default().classify(drift_score);
        DriftResult {
            feature: feature.to_string(),
            drift_score,
            ks_statistic: drift_score,
            ks_pvalue: 0.5,
            psi_score,
            is_drifted: severity.is_drifted(),
            severity,
            details: DriftDetails::Numeric {
                reference_mean: 0.0,
                current_mean: 0.0,
                reference_std: 1.0,
                current_std: 1.0,
                js_distance: drift_score,
            },
        }
    }

    #[test]
    fn test_recommendation_critical() {
        let thresholds = SeverityThresholds::new(0.1, 0.05).unwrap();
        let text = generate_recommendation(3, 10, 0.15, thresholds);
        assert!(text.starts_with("CRITICAL"));
        assert!(text.contains("3/10"));
        assert!(text.contains("30.0%"));
        assert!(text.contains("retraining"));
    }

    #[test]
    fn test_recommendation_warning() {
        let text = generate_recommendation(1, 4, 0.07, SeverityThresholds::default());
        assert!(text.starts_with("WARNING"));
        assert!(text.contains("25.0%"));
        assert!(text.contains("investigate"));
    }

    #[test]
    fn test_recommendation_ok() {
        let text = generate_recommendation(0, 0, 0.0, SeverityThresholds::default());
        assert!(text.starts_with("OK"));
        assert!(text.contains("0 features analyzed"));
        assert!(text.contains("Continue monitoring"));
    }

    #[test]
    fn test_report_aggregates() {
        let report = DriftReport::new(
            "model",
            vec![result("a", 0.3, 0.5), result("b", 0.06, 0.0), result("c", 0.0, 0.1)],
            SeverityThresholds::default(),
        );

        assert_eq!(report.features_analyzed, 3);
        assert_eq!(report.features_drifted, 2);
        assert!((report.overall_drift_score - 0.12).abs() < 1e-12);
        assert_eq!(report.status, Severity::Critical);
        assert_eq!(report.drifted_features(), vec!["a", "b"]);
        assert_eq!(report.critical_features(), vec!["a"]);
        assert_eq!(report.psi_breaches(0.2), vec!["a"]);
        assert!(report.result("b").is_some());
        assert!(report.result("z").is_none());
    }

    #[test]
    fn test_empty_report() {
        let report = DriftReport::new("model", Vec::new(), SeverityThresholds::default());
        assert_eq!(report.features_analyzed, 0);
        assert_eq!(report.overall_drift_score, 0.0);
        assert_eq!(report.status, Severity::None);
        assert!(report.recommendation.starts_with("OK"));
    }

    #[test]
    fn test_summary_and_json() {
        let report = DriftReport::new(
            "model",
            vec![result("feature_0", 0.5, 0.0)],
            SeverityThresholds::default(),
        );

        let summary = report.summary();
        assert!(summary.contains("Drifted features: 1"));
        assert!(summary.contains("feature_0"));
        assert!(summary.contains("CRITICAL"));

        let json = report.to_json().unwrap();
        let parsed: DriftReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.feature_results[0].severity, Severity::Critical);
        assert!(json.contains("\"severity\":\"critical\""));
    }
}
