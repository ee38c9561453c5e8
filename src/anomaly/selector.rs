//! Final anomaly set selection

use super::{percentile, Detection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How the anomaly set was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Records the model labelled anomalous
    Primary,
    /// Records scoring at or below the fallback percentile threshold
    Fallback,
}

/// Anomaly set selected from a [`Detection`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySelection {
    /// Selected record positions, ascending
    pub indices: Vec<usize>,
    /// Percentile threshold over all scores; `None` for an empty corpus.
    /// Computed even when the primary set is used.
    pub threshold: Option<f64>,
    pub strategy: SelectionStrategy,
}

impl AnomalySelection {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn used_fallback(&self) -> bool {
        self.strategy == SelectionStrategy::Fallback
    }

    /// Selected positions ordered by ascending score, most anomalous first.
    /// Equal scores keep position order.
    pub fn ranked(&self, scores: &[f64]) -> Vec<usize> {
        let mut ranked = self.indices.clone();
        ranked.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
        ranked
    }

    /// First `n` of [`Self::ranked`]
    pub fn top(&self, scores: &[f64], n: usize) -> Vec<usize> {
        let mut ranked = self.ranked(scores);
        ranked.truncate(n);
        ranked
    }
}

/// Chooses the final anomaly set.
///
/// The model's own labels win whenever at least one record is labelled
/// anomalous. Only a fully empty primary set switches to every record whose
/// score is at or below the given percentile of all scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySelector {
    fallback_percentile: f64,
}

impl Default for AnomalySelector {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl AnomalySelector {
    pub fn new(fallback_percentile: f64) -> Self {
        Self {
            fallback_percentile: fallback_percentile.clamp(0.0, 100.0),
        }
    }

    pub fn fallback_percentile(&self) -> f64 {
        self.fallback_percentile
    }

    pub fn select(&self, detection: &Detection) -> AnomalySelection {
        let scores = detection.scores.to_vec();
        let threshold = percentile(&scores, self.fallback_percentile);

        let primary: Vec<usize> = (0..detection.len())
            .filter(|&i| detection.is_anomalous(i))
            .collect();

        if !primary.is_empty() {
            debug!(n_anomalies = primary.len(), "Using model labels");
            return AnomalySelection {
                indices: primary,
                threshold,
                strategy: SelectionStrategy::Primary,
            };
        }

        let indices: Vec<usize> = match threshold {
            Some(t) => (0..scores.len()).filter(|&i| scores[i] <= t).collect(),
            None => Vec::new(),
        };

        info!(
            percentile = self.fallback_percentile,
            threshold = ?threshold,
            n_anomalies = indices.len(),
            "No record labelled anomalous, using percentile threshold"
        );

        AnomalySelection {
            indices,
            threshold,
            strategy: SelectionStrategy::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{ANOMALY, NORMAL};
    use ndarray::Array1;

    fn detection(scores: Vec<f64>, labels: Vec<i32>) -> Detection {
        Detection {
            scores: Array1::from_vec(scores),
            labels: Array1::from_vec(labels),
            offset: 0.0,
        }
    }

    #[test]
    fn test_primary_selection_wins() {
        let d = detection(
            vec![0.2, -0.1, 0.3, -0.4, 0.05],
            vec![NORMAL, ANOMALY, NORMAL, ANOMALY, NORMAL],
        );
        let selection = AnomalySelector::default().select(&d);

        assert_eq!(selection.strategy, SelectionStrategy::Primary);
        assert_eq!(selection.indices, vec![1, 3]);
        assert!(selection.threshold.is_some());
    }

    #[test]
    fn test_single_primary_anomaly_does_not_fall_back() {
        let mut labels = vec![NORMAL; 100];
        labels[42] = ANOMALY;
        let scores: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let selection = AnomalySelector::default().select(&detection(scores, labels));

        assert!(!selection.used_fallback());
        assert_eq!(selection.indices, vec![42]);
    }

    #[test]
    fn test_fallback_selects_lowest_five_percent() {
        // 40 distinct scores: the 5th percentile lies between the 2nd and 3rd
        let scores: Vec<f64> = (0..40).rev().map(|i| i as f64 * 0.01).collect();
        let selection = AnomalySelector::new(5.0).select(&detection(scores, vec![NORMAL; 40]));

        assert!(selection.used_fallback());
        assert_eq!(selection.len(), (0.05_f64 * 40.0).ceil() as usize);
        assert_eq!(selection.indices, vec![38, 39]);
    }

    #[test]
    fn test_fallback_includes_ties() {
        let selection = AnomalySelector::default().select(&detection(vec![0.0; 10], vec![NORMAL; 10]));
        assert!(selection.used_fallback());
        assert_eq!(selection.len(), 10);
        assert_eq!(selection.threshold, Some(0.0));
    }

    #[test]
    fn test_empty_detection() {
        let selection = AnomalySelector::default().select(&detection(vec![], vec![]));
        assert!(selection.is_empty());
        assert_eq!(selection.threshold, None);
    }

    #[test]
    fn test_ranked_ascending() {
        let scores = vec![0.1, -0.3, -0.3, -0.5];
        let selection = AnomalySelection {
            indices: vec![0, 1, 2, 3],
            threshold: None,
            strategy: SelectionStrategy::Primary,
        };
        assert_eq!(selection.ranked(&scores), vec![3, 1, 2, 0]);
        assert_eq!(selection.top(&scores, 2), vec![3, 1]);
    }
}
