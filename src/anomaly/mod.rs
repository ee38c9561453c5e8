//! Anomaly detection module
//!
//! Provides:
//! - Isolation Forest scoring and labelling of transformed movement vectors
//! - Selection of the final anomaly set, with a percentile fallback when the
//!   model flags nothing

mod isolation_forest;
mod selector;

pub use isolation_forest::{IsolationForest, IsolationTree};
pub use selector::{AnomalySelection, AnomalySelector, SelectionStrategy};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Label of an anomalous record
pub const ANOMALY: i32 = -1;
/// Label of a normal record
pub const NORMAL: i32 = 1;

/// Scores and labels for every record of a corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Decision function values (lower = more anomalous, negative = flagged)
    pub scores: Array1<f64>,
    /// Binary labels (-1 = anomaly, 1 = normal)
    pub labels: Array1<i32>,
    /// Model cutoff subtracted from the raw scores
    pub offset: f64,
}

impl Detection {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Number of records labelled anomalous by the model
    pub fn n_anomalies(&self) -> usize {
        self.labels.iter().filter(|&&l| l == ANOMALY).count()
    }

    pub fn is_anomalous(&self, position: usize) -> bool {
        self.labels.get(position) == Some(&ANOMALY)
    }
}

/// Trait for anomaly detectors
pub trait AnomalyDetector: Send + Sync {
    /// Fit the detector on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Raw per-sample scores, lower = more anomalous
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Cutoff on the raw scores learned during fit
    fn offset(&self) -> Result<f64>;

    /// Raw scores shifted so that the cutoff sits at 0
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.score_samples(x)? - self.offset()?)
    }

    /// Predict labels (-1 = anomaly, 1 = normal)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        Ok(self.decision_function(x)?.mapv(label_for))
    }

    /// Fit and predict in one step
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Get detection results with scores and labels
    fn detect(&self, x: &Array2<f64>) -> Result<Detection> {
        let scores = self.decision_function(x)?;
        let labels = scores.mapv(label_for);

        Ok(Detection {
            scores,
            labels,
            offset: self.offset()?,
        })
    }
}

fn label_for(decision: f64) -> i32 {
    if decision < 0.0 {
        ANOMALY
    } else {
        NORMAL
    }
}

/// q-th percentile (0..=100) with linear interpolation between order statistics
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert!((percentile(&values, 5.0).unwrap() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_edge_cases() {
        assert_eq!(percentile(&[], 5.0), None);
        assert_eq!(percentile(&[2.5], 5.0), Some(2.5));
        assert_eq!(percentile(&[0.0, 0.0, 0.0], 5.0), Some(0.0));
    }

    #[test]
    fn test_detection_counts() {
        let detection = Detection {
            scores: Array1::from_vec(vec![-0.2, 0.1, 0.3]),
            labels: Array1::from_vec(vec![ANOMALY, NORMAL, NORMAL]),
            offset: -0.5,
        };
        assert_eq!(detection.n_anomalies(), 1);
        assert!(detection.is_anomalous(0));
        assert!(!detection.is_anomalous(2));
        assert!(!detection.is_anomalous(10));
    }
}
