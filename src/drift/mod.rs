//! Drift detection module
//!
//! Compares a current dataset against a stored reference profile and
//! reports, per feature, how far its distribution has moved.
//!
//! - [`data_drift`]: two-sample tests (KS, PSI, chi-squared, Jensen-Shannon)
//! - [`ReferenceProfile`]: per-feature statistics captured from reference data
//! - [`FeatureDriftAnalyzer`]: scores one feature and assigns a severity
//! - [`DriftDetector`]: runs the analyzer over every reference feature

mod config;
pub mod data_drift;
mod detector;
mod feature_drift;
mod profile;
mod report;

pub use config::DriftConfig;
pub use data_drift::{chi_squared, jensen_shannon_distance, ks_test, psi, TestOutcome};
pub use detector::DriftDetector;
pub use feature_drift::{
    DriftDetails, DriftResult, FeatureDriftAnalyzer, Severity, SeverityThresholds,
};
pub use profile::{
    mean_std, CategoricalStats, FeatureKind, FeatureProfile, FeatureStats, FeatureValues, Histogram,
    NumericStats, Quantiles, ReferenceProfile,
};
pub use report::{generate_recommendation, DriftReport};
