//! Error types for stock movement anomaly detection

use thiserror::Error;

/// Result type alias for stockforest operations
pub type Result<T> = std::result::Result<T, StockForestError>;

/// Main error type for the detection pipeline
#[derive(Error, Debug)]
pub enum StockForestError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Column not found: {0}")]
    FeatureNotFound(String),

    #[error("Dataset contains no movement records")]
    EmptyDataset,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for StockForestError {
    fn from(err: polars::error::PolarsError) -> Self {
        StockForestError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for StockForestError {
    fn from(err: serde_json::Error) -> Self {
        StockForestError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for StockForestError {
    fn from(err: ndarray::ShapeError) -> Self {
        StockForestError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
