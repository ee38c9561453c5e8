//! Equal-width histogram of anomaly scores, rendered as text

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Histogram over `[min, max]` with equal-width bins. The last bin is closed
/// on the right so the maximum is counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistogram {
    /// `bins + 1` edges, ascending
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl ScoreHistogram {
    /// `None` when `scores` is empty or `bins` is 0
    pub fn new(scores: &[f64], bins: usize) -> Option<Self> {
        if scores.is_empty() || bins == 0 {
            return None;
        }

        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A single distinct value still gets a unit-wide range
        let (lo, hi) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
        let width = (hi - lo) / bins as f64;

        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for &s in scores {
            let bin = (((s - lo) / width).floor() as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Some(Self { edges, counts })
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Bin containing `value`, `None` outside the histogram range
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        let first = *self.edges.first()?;
        let last = *self.edges.last()?;
        if !(first..=last).contains(&value) {
            return None;
        }
        let width = (last - first) / self.n_bins() as f64;
        Some((((value - first) / width).floor() as usize).min(self.n_bins() - 1))
    }

    /// One line per bin with a bar scaled to `bar_width` characters; the bin
    /// holding `threshold` is marked with `<- threshold`.
    pub fn render(&self, bar_width: usize, threshold: Option<f64>) -> String {
        let peak = self.counts.iter().copied().max().unwrap_or(0).max(1);
        let marked = threshold.and_then(|t| self.bin_of(t));
        let mut out = String::new();

        for (i, &count) in self.counts.iter().enumerate() {
            let len = (count * bar_width).div_ceil(peak);
            let _ = write!(
                out,
                "{:>9.4} | {:<width$} {}",
                self.edges[i],
                "#".repeat(len),
                count,
                width = bar_width
            );
            if marked == Some(i) {
                out.push_str("  <- threshold");
            }
            out.push('\n');
        }
        out
    }
}
