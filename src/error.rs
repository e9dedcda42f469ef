//! Error types for the drift monitor

use thiserror::Error;

/// Result type alias for drift monitor operations
pub type Result<T> = std::result::Result<T, DriftError>;

/// Main error type for drift detection
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Reference data not set. Call set_reference first")]
    ReferenceNotSet,

    #[error("Empty reference data: {0}")]
    EmptyReference(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DriftError {
    /// Whether this error comes from detector setup rather than from the data
    /// handed to a single call. Configuration errors are never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DriftError::ReferenceNotSet
                | DriftError::EmptyReference(_)
                | DriftError::ConfigError(_)
                | DriftError::InvalidParameter { .. }
        )
    }
}

impl From<polars::error::PolarsError> for DriftError {
    fn from(err: polars::error::PolarsError) -> Self {
        DriftError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DriftError {
    fn from(err: serde_json::Error) -> Self {
        DriftError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriftError::EmptyInput("reference sample".to_string());
        assert_eq!(err.to_string(), "Empty input: reference sample");
    }

    #[test]
    fn test_reference_not_set_is_configuration() {
        assert!(DriftError::ReferenceNotSet.is_configuration());
        assert!(DriftError::EmptyReference("no columns".to_string()).is_configuration());
        assert!(!DriftError::EmptyInput("x".to_string()).is_configuration());
        assert!(!DriftError::DataError("x".to_string()).is_configuration());
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DriftError = json_err.into();
        assert!(matches!(err, DriftError::SerializationError(_)));
    }
}
