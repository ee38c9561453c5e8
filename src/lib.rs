//! stockforest - Stock movement anomaly detection
//!
//! This crate scans an inventory movement log and flags statistically
//! abnormal movements:
//! - Per-article temporal features (gaps, deltas, rolling means)
//! - Standard scaling and one-hot encoding into a numeric matrix
//! - Isolation forest scoring with a contamination-based threshold
//! - Percentile fallback when the model labels nothing
//!
//! # Modules
//!
//! ## Detection
//! - [`feature_engineering`] - Movement feature construction
//! - [`preprocessing`] - Scaling and encoding
//! - [`anomaly`] - Isolation forest and anomaly selection
//! - [`pipeline`] - End-to-end detection run
//!
//! ## Data
//! - [`records`] - Typed movement records
//! - [`utils`] - CSV loading and anomaly export
//!
//! ## Reporting
//! - [`report`] - Score and anomaly summaries
//! - [`visualization`] - Console histograms
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod records;
pub mod utils;

// Detection
pub mod feature_engineering;
pub mod preprocessing;
pub mod anomaly;
pub mod pipeline;

// Reporting
pub mod report;
pub mod visualization;
pub mod cli;

pub use error::{Result, StockForestError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::anomaly::{AnomalyDetector, AnomalySelector, Detection, IsolationForest};
    pub use crate::config::{DetectionConfig, MaxSamples};
    pub use crate::error::{Result, StockForestError};
    pub use crate::feature_engineering::{FeatureTable, MovementFeatureBuilder};
    pub use crate::pipeline::{DetectionReport, StockForestPipeline};
    pub use crate::preprocessing::MovementTransform;
    pub use crate::records::MovementRecord;
    pub use crate::utils::{AnomalyExporter, ExportOutcome, MovementLoader};
}
