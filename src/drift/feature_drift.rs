//! Per-feature drift analysis
//!
//! Runs the tests that fit a feature's type, folds them into a single drift
//! score and classifies the score into a severity tier.

use crate::drift::config::DriftConfig;
use crate::drift::data_drift::{chi_squared, jensen_shannon_distance, ks_test, psi};
use crate::drift::profile::{mean_std, FeatureStats, FeatureValues};
use crate::error::{DriftError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Drift severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Warning and critical both count as drift
    pub fn is_drifted(&self) -> bool {
        !matches!(self, Severity::None)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score cut-offs for the severity tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// Scores at or above this are critical
    pub drift: f64,
    /// Scores at or above this (and below `drift`) are warnings
    pub warning: f64,
}

impl SeverityThresholds {
    pub fn new(drift: f64, warning: f64) -> Result<Self> {
        if !(drift.is_finite() && warning.is_finite()) {
            return Err(DriftError::ConfigError("thresholds must be finite".to_string()));
        }
        if warning > drift {
            return Err(DriftError::InvalidParameter {
                name: "warning_threshold".to_string(),
                value: warning.to_string(),
                reason: format!("must not exceed drift_threshold ({})", drift),
            });
        }
        Ok(Self { drift, warning })
    }

    pub fn classify(&self, score: f64) -> Severity {
        if score >= self.drift {
            Severity::Critical
        } else if score >= self.warning {
            Severity::Warning
        } else {
            Severity::None
        }
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self { drift: 0.1, warning: 0.05 }
    }
}

/// Type-dependent diagnostics attached to a [`DriftResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DriftDetails {
    Numeric {
        reference_mean: f64,
        current_mean: f64,
        reference_std: f64,
        current_std: f64,
        js_distance: f64,
    },
    Categorical {
        chi_squared_statistic: f64,
        chi_squared_pvalue: f64,
        reference_categories: Vec<String>,
        current_categories: Vec<String>,
    },
}

/// Drift analysis of one feature in one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub feature: String,
    pub drift_score: f64,
    /// KS statistic, or the bounded chi-squared statistic for categorical features
    pub ks_statistic: f64,
    /// KS p-value, or the chi-squared p-value for categorical features
    pub ks_pvalue: f64,
    /// PSI, always 0 for categorical features
    pub psi_score: f64,
    pub is_drifted: bool,
    pub severity: Severity,
    pub details: DriftDetails,
}

/// Stateless per-feature analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureDriftAnalyzer {
    n_bins: usize,
    thresholds: SeverityThresholds,
}

impl FeatureDriftAnalyzer {
    pub fn new(n_bins: usize, thresholds: SeverityThresholds) -> Self {
        Self {
            n_bins: n_bins.max(1),
            thresholds,
        }
    }

    pub fn from_config(config: &DriftConfig) -> Result<Self> {
        let thresholds = SeverityThresholds::new(config.drift_threshold, config.warning_threshold)?;
        Ok(Self::new(config.n_bins, thresholds))
    }

    pub fn thresholds(&self) -> SeverityThresholds {
        self.thresholds
    }

    /// Compare `current` against `reference` for one feature. The branch is
    /// chosen by the type tag of `reference_stats`.
    pub fn analyze(
        &self,
        feature_name: &str,
        reference: &FeatureValues,
        current: &FeatureValues,
        reference_stats: &FeatureStats,
    ) -> Result<DriftResult> {
        match (reference_stats, reference, current) {
            (
                FeatureStats::Numeric(stats),
                FeatureValues::Numeric(ref_vals),
                FeatureValues::Numeric(cur_vals),
            ) => {
                let ks = ks_test(ref_vals, cur_vals)?;
                let psi_score = psi(ref_vals, cur_vals, self.n_bins)?;
                let js_distance = jensen_shannon_distance(ref_vals, cur_vals, self.n_bins)?;
                let drift_score = (ks.statistic + js_distance) / 2.0;

                let (current_mean, current_std) = mean_std(cur_vals);
                let details = DriftDetails::Numeric {
                    reference_mean: stats.mean,
                    current_mean,
                    reference_std: stats.std,
                    current_std,
                    js_distance,
                };

                Ok(self.finish(
                    feature_name,
                    drift_score,
                    ks.statistic,
                    ks.p_value,
                    psi_score,
                    details,
                ))
            }
            (
                FeatureStats::Categorical(stats),
                FeatureValues::Categorical(ref_vals),
                FeatureValues::Categorical(cur_vals),
            ) => {
                let chi = chi_squared(ref_vals, cur_vals)?;
                let normalized = chi.statistic / (chi.statistic + ref_vals.len() as f64);
                // A vanishing p-value is maximal drift
                let drift_score = if chi.p_value > 0.0 { 1.0 - chi.p_value } else { 1.0 };

                let details = DriftDetails::Categorical {
                    chi_squared_statistic: chi.statistic,
                    chi_squared_pvalue: chi.p_value,
                    reference_categories: stats.categories.clone(),
                    current_categories: distinct_in_order(cur_vals),
                };

                Ok(self.finish(feature_name, drift_score, normalized, chi.p_value, 0.0, details))
            }
            _ => Err(DriftError::InvalidInput(format!(
                "Feature {} expects {:?} values, got reference {:?} and current {:?}",
                feature_name,
                reference_stats.kind(),
                reference.kind(),
                current.kind()
            ))),
        }
    }

    fn finish(
        &self,
        feature_name: &str,
        drift_score: f64,
        ks_statistic: f64,
        ks_pvalue: f64,
        psi_score: f64,
        details: DriftDetails,
    ) -> DriftResult {
        let severity = self.thresholds.classify(drift_score);
        DriftResult {
            feature: feature_name.to_string(),
            drift_score,
            ks_statistic,
            ks_pvalue,
            psi_score,
            is_drifted: severity.is_drifted(),
            severity,
            details,
        }
    }
}

impl Default for FeatureDriftAnalyzer {
    fn default() -> Self {
        Self::new(10, SeverityThresholds::default())
    }
}

fn distinct_in_order(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}
