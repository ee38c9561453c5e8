//! Isolation Forest anomaly detection

use crate::anomaly::{percentile, AnomalyDetector};
use crate::config::MaxSamples;
use crate::error::{Result, StockForestError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values <= threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values > threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of samples in this node
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree over the rows of `x` listed in `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if depth >= max_depth || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| (lo.min(x[[i, feature]]), hi.max(x[[i, feature]])),
                );
                (max > min && min.is_finite() && max.is_finite()).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let (feature, min_val, max_val) = candidates[rng.gen_range(0..candidates.len())];
        // Interpolated draw: `max_val - min_val` may overflow for extreme columns
        let u: f64 = rng.gen();
        let threshold = min_val * (1.0 - u) + max_val * u;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, depth + 1, max_depth, rng));
        let right = Box::new(Self::build(x, &right_indices, depth + 1, max_depth, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Depth reached by `sample`, plus the expected remaining depth of its leaf
    pub fn path_length(&self, sample: ArrayView1<f64>, current_depth: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_depth as f64 + average_path_length(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.path_length(sample, current_depth + 1)
                } else {
                    right.path_length(sample, current_depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points:
/// c(n) = 2 (ln(n - 1) + γ) - 2 (n - 1) / n
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation Forest anomaly detector.
///
/// `score_samples` returns `-2^(-E[h(x)] / c(ψ))`, so lower is more
/// anomalous. The offset is the `contamination` quantile of the training
/// scores; `decision_function` subtracts it, making flagged records negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Subsample size per tree
    max_samples: MaxSamples,
    /// Contamination ratio (expected proportion of outliers)
    contamination: f64,
    /// Random seed
    seed: Option<u64>,
    /// Fitted trees
    trees: Option<Vec<IsolationTree>>,
    /// Cutoff on raw scores
    offset: Option<f64>,
    /// Subsample size actually used for fitting
    samples_per_tree: Option<usize>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: MaxSamples::Auto,
            contamination: 0.01,
            seed: None,
            trees: None,
            offset: None,
            samples_per_tree: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set subsample size per tree
    pub fn with_max_samples(mut self, max_samples: MaxSamples) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Set contamination ratio
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn trees(&self) -> Option<&[IsolationTree]> {
        self.trees.as_deref()
    }

    pub fn is_fitted(&self) -> bool {
        self.trees.is_some()
    }

    /// Mean path length of every row across the ensemble
    fn average_depths(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(StockForestError::ModelNotFitted)?;

        let depths: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let sample = x.row(i);
                trees
                    .iter()
                    .map(|tree| tree.path_length(sample, 0))
                    .sum::<f64>()
                    / trees.len() as f64
            })
            .collect();

        Ok(Array1::from_vec(depths))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(StockForestError::EmptyDataset);
        }
        let start = Instant::now();

        let samples_per_tree = self.max_samples.resolve(n_samples);
        let max_depth = (samples_per_tree as f64).log2().ceil() as usize;
        let base_seed = self.seed.unwrap_or_else(rand::random);

        // Each tree owns a seed derived from its index, so the parallel
        // build gives the same forest as a sequential one
        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let indices = rand::seq::index::sample(&mut rng, n_samples, samples_per_tree).into_vec();
                IsolationTree::build(x, &indices, 0, max_depth, &mut rng)
            })
            .collect();

        self.trees = Some(trees);
        self.samples_per_tree = Some(samples_per_tree);
        self.offset = None;

        let scores = self.score_samples(x)?;
        let offset = percentile(&scores.to_vec(), 100.0 * self.contamination)
            .ok_or(StockForestError::EmptyDataset)?;
        self.offset = Some(offset);

        debug!(
            n_samples,
            samples_per_tree,
            max_depth,
            n_estimators = self.n_estimators,
            offset,
            elapsed = ?start.elapsed(),
            "Fitted isolation forest"
        );
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let depths = self.average_depths(x)?;
        let c_n = average_path_length(self.samples_per_tree.unwrap_or(1));

        Ok(depths.mapv(|depth| {
            // A single-point subsample has c = 0; every record then scores -0.5
            let ratio = if c_n > 0.0 { depth / c_n } else { 1.0 };
            -(2.0_f64.powf(-ratio))
        }))
    }

    fn offset(&self) -> Result<f64> {
        self.offset.ok_or(StockForestError::ModelNotFitted)
    }
}
