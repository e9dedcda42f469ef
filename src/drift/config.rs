//! Drift detector configuration

use crate::error::{DriftError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`DriftDetector`](super::DriftDetector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Name of the monitored model, used as the `model` metric label
    pub model_name: String,

    /// Drift score at or above which a feature is critical
    pub drift_threshold: f64,

    /// Drift score at or above which a feature is a warning
    pub warning_threshold: f64,

    /// PSI policy threshold. Not used in scoring; exposed for callers
    pub psi_threshold: f64,

    /// Number of equal-width bins for histogram based measures
    pub n_bins: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            model_name: "default-model".to_string(),
            drift_threshold: 0.1,
            warning_threshold: 0.05,
            psi_threshold: 0.2,
            n_bins: 10,
        }
    }
}

impl DriftConfig {
    /// Create a configuration with default thresholds for `model_name`
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Builder method to set the critical drift threshold
    pub fn with_drift_threshold(mut self, threshold: f64) -> Self {
        self.drift_threshold = threshold;
        self
    }

    /// Builder method to set the warning threshold
    pub fn with_warning_threshold(mut self, threshold: f64) -> Self {
        self.warning_threshold = threshold;
        self
    }

    /// Builder method to set the PSI policy threshold
    pub fn with_psi_threshold(mut self, threshold: f64) -> Self {
        self.psi_threshold = threshold;
        self
    }

    /// Builder method to set the number of histogram bins
    pub fn with_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    /// Check the configuration, failing on the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(DriftError::ConfigError("model_name must not be empty".to_string()));
        }

        for (name, value) in [
            ("drift_threshold", self.drift_threshold),
            ("warning_threshold", self.warning_threshold),
            ("psi_threshold", self.psi_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DriftError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be a finite, non-negative number".to_string(),
                });
            }
        }

        if self.warning_threshold > self.drift_threshold {
            return Err(DriftError::InvalidParameter {
                name: "warning_threshold".to_string(),
                value: self.warning_threshold.to_string(),
                reason: format!("must not exceed drift_threshold ({})", self.drift_threshold),
            });
        }

        if self.n_bins == 0 {
            return Err(DriftError::InvalidParameter {
                name: "n_bins".to_string(),
                value: "0".to_string(),
                reason: "at least one bin is required".to_string(),
            });
        }

        Ok(())
    }
}
