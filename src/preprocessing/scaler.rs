//! Standard (z-score) scaling of numeric feature columns

use crate::error::{Result, StockForestError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column standardization: (x - mean) / std.
///
/// The standard deviation is the population one; a constant column keeps a
/// scale of 1 so it maps to all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn column means and scales
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(StockForestError::EmptyDataset);
        }

        let n = x.nrows() as f64;
        let mut mean = x
            .mean_axis(Axis(0))
            .ok_or(StockForestError::EmptyDataset)?;
        // Column sums near f64::MAX overflow; average pre-divided values instead
        for (j, m) in mean.iter_mut().enumerate() {
            if !m.is_finite() {
                *m = x.column(j).iter().map(|v| v / n).sum();
            }
        }
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Apply the learned scaling. Values that overflow are zero-filled.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(StockForestError::ModelNotFitted),
        };

        if x.ncols() != mean.len() {
            return Err(StockForestError::ShapeError {
                expected: format!("{} columns", mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        Ok(((x - mean) / scale).mapv_into(|v| if v.is_finite() { v } else { 0.0 }))
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}
