//! Column transform: standardized numeric block followed by one-hot blocks

use crate::error::{Result, StockForestError};
use crate::feature_engineering::{FeatureTable, MovementFeatures, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use super::{encoder::OneHotEncoder, scaler::StandardScaler};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Fitted transform from [`MovementFeatures`] to fixed-width numeric vectors.
///
/// Output columns are the seven numeric features (standardized) followed by
/// the indicator columns of each categorical feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementTransform {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl MovementTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit scaler and encoder on the whole feature table
    pub fn fit(&mut self, table: &FeatureTable) -> Result<&mut Self> {
        if table.is_empty() {
            return Err(StockForestError::EmptyDataset);
        }
        let start = Instant::now();

        self.scaler.fit(&numeric_matrix(table.features())?)?;
        self.encoder.fit(&categorical_rows(table.features()))?;
        self.is_fitted = true;

        debug!(
            n_records = table.len(),
            n_features = self.n_features(),
            elapsed = ?start.elapsed(),
            "Fitted movement transform"
        );
        Ok(self)
    }

    /// Transform features into one row per record, in table order
    pub fn transform(&self, table: &FeatureTable) -> Result<Array2<f64>> {
        self.transform_features(table.features())
    }

    /// Transform an arbitrary slice of feature sets
    pub fn transform_features(&self, features: &[MovementFeatures]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(StockForestError::ModelNotFitted);
        }

        let numeric = self.scaler.transform(&numeric_matrix(features)?)?;
        let categorical = self.encoder.transform(&categorical_rows(features))?;

        Ok(concatenate(Axis(1), &[numeric.view(), categorical.view()])?)
    }

    pub fn fit_transform(&mut self, table: &FeatureTable) -> Result<Array2<f64>> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Width of the transformed vectors
    pub fn n_features(&self) -> usize {
        NUMERIC_FEATURES.len() + self.encoder.n_output_columns()
    }

    /// Names of the transformed columns, in output order
    pub fn feature_names(&self) -> Vec<String> {
        NUMERIC_FEATURES
            .iter()
            .map(|n| n.to_string())
            .chain(self.encoder.feature_names(&CATEGORICAL_FEATURES))
            .collect()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn numeric_matrix(features: &[MovementFeatures]) -> Result<Array2<f64>> {
    let values: Vec<f64> = features.iter().flat_map(|f| f.numeric()).collect();
    Ok(Array2::from_shape_vec((features.len(), NUMERIC_FEATURES.len()), values)?)
}

fn categorical_rows(features: &[MovementFeatures]) -> Vec<[&str; 7]> {
    features.iter().map(|f| f.categorical()).collect()
}
