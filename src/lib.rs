//! Drift Monitor - data drift detection for deployed ML models
//!
//! Captures a statistical profile of the data a model was trained on and
//! scores each new batch of production data against it, feature by feature.
//!
//! # Modules
//!
//! - [`drift`] - Statistical tests, reference profiles, per-feature analysis
//!   and the [`DriftDetector`](drift::DriftDetector) orchestrator
//! - [`monitoring`] - Metric names and sinks for drift observations
//! - [`error`] - Error type shared by the crate
//!
//! # Example
//!
//! ```no_run
//! use drift_monitor::prelude::*;
//! use polars::prelude::*;
//!
//! # fn main() -> drift_monitor::Result<()> {
//! let reference = df!("age" => &[31.0, 45.0, 27.0, 52.0])?;
//! let current = df!("age" => &[61.0, 58.0, 70.0, 66.0])?;
//!
//! let detector = DriftDetector::new(DriftConfig::new("churn-model"))?;
//! detector.set_reference(&reference)?;
//! let report = detector.detect(&current)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod drift;
pub mod monitoring;

pub use error::{DriftError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DriftError, Result};

    // Drift detection
    pub use crate::drift::{
        DriftConfig, DriftDetector, DriftReport, DriftResult, FeatureDriftAnalyzer,
        ReferenceProfile, Severity, SeverityThresholds,
    };

    // Monitoring
    pub use crate::monitoring::{InMemoryMetrics, MetricsSink, NoopMetrics};
}
