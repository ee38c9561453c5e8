//! Detection configuration

use crate::error::{Result, StockForestError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of points drawn to build each isolation tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxSamples {
    /// min(256, n_samples)
    Auto,
    /// Fixed count, capped at n_samples
    Fixed(usize),
}

impl MaxSamples {
    /// Resolve the subsample size for a corpus of `n_samples` rows
    pub fn resolve(&self, n_samples: usize) -> usize {
        match self {
            MaxSamples::Auto => n_samples.min(256),
            MaxSamples::Fixed(n) => (*n).min(n_samples),
        }
        .max(1)
    }
}

/// Configuration for the stock movement anomaly pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Field separator of the movement log
    pub input_separator: char,

    /// Field separator of the exported anomaly file
    pub output_separator: char,

    /// chrono format of `Date_Mouvement`
    pub timestamp_format: String,

    /// Category substituted for missing categorical values
    pub missing_category: String,

    /// Trailing window of the rolling quantity mean
    pub rolling_window: usize,

    /// Number of isolation trees
    pub n_estimators: usize,

    /// Subsample size per tree
    pub max_samples: MaxSamples,

    /// Expected share of anomalies, drives the model's own cutoff
    pub contamination: f64,

    /// Random seed for tree construction
    pub seed: u64,

    /// Score percentile used when the model flags nothing
    pub fallback_percentile: f64,

    /// Number of ranked anomalies shown in reports
    pub top_n: usize,

    /// Bins of the score histogram
    pub histogram_bins: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            input_separator: ';',
            output_separator: ',',
            timestamp_format: "%Y-%m-%d %H:%M:%S%.f".to_string(),
            missing_category: "ZZZZZ".to_string(),
            rolling_window: 3,
            n_estimators: 100,
            max_samples: MaxSamples::Auto,
            contamination: 0.01,
            seed: 42,
            fallback_percentile: 5.0,
            top_n: 10,
            histogram_bins: 50,
        }
    }
}

impl DetectionConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_samples(mut self, max_samples: MaxSamples) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_fallback_percentile(mut self, percentile: f64) -> Self {
        self.fallback_percentile = percentile;
        self
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    /// Check that every parameter is within its accepted range
    pub fn validate(&self) -> Result<()> {
        if !self.input_separator.is_ascii() || !self.output_separator.is_ascii() {
            return Err(StockForestError::ConfigError(
                "separators must be single ASCII characters".to_string(),
            ));
        }
        if self.rolling_window == 0 {
            return Err(StockForestError::ConfigError(
                "rolling_window must be at least 1".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(StockForestError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if let MaxSamples::Fixed(0) = self.max_samples {
            return Err(StockForestError::ConfigError(
                "max_samples must be at least 1".to_string(),
            ));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(StockForestError::ConfigError(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if !(0.0..=100.0).contains(&self.fallback_percentile) {
            return Err(StockForestError::ConfigError(format!(
                "fallback_percentile must be in [0, 100], got {}",
                self.fallback_percentile
            )));
        }
        if self.histogram_bins == 0 {
            return Err(StockForestError::ConfigError(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if self.missing_category.is_empty() {
            return Err(StockForestError::ConfigError(
                "missing_category must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
