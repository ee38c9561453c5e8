//! End-to-end anomaly pipeline over a batch of movement records

use crate::anomaly::{AnomalyDetector, AnomalySelection, AnomalySelector, Detection, IsolationForest};
use crate::config::DetectionConfig;
use crate::error::{Result, StockForestError};
use crate::feature_engineering::{FeatureTable, MovementFeatureBuilder};
use crate::preprocessing::MovementTransform;
use crate::records::MovementRecord;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Output of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Derived features, indexed like the input records
    pub features: FeatureTable,
    /// Width of the transformed vectors
    pub n_model_features: usize,
    /// Scores and labels per record
    pub detection: Detection,
    /// Final anomaly set
    pub selection: AnomalySelection,
}

impl DetectionReport {
    /// Decision scores as a plain slice, indexed like the input records
    pub fn scores(&self) -> Vec<f64> {
        self.detection.scores.to_vec()
    }
}

/// Feature building, transform, model and selection in one explicit object.
///
/// Fitted state lives on the struct after [`Self::run`] and can be inspected
/// through [`Self::transform`] and [`Self::model`]. Transform and model are
/// fitted on the same corpus they score.
#[derive(Debug, Clone)]
pub struct StockForestPipeline {
    config: DetectionConfig,
    transform: MovementTransform,
    model: IsolationForest,
}

impl StockForestPipeline {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        let model = IsolationForest::new()
            .with_n_estimators(config.n_estimators)
            .with_max_samples(config.max_samples)
            .with_contamination(config.contamination)
            .with_seed(config.seed);

        Ok(Self {
            config,
            transform: MovementTransform::new(),
            model,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn transform(&self) -> &MovementTransform {
        &self.transform
    }

    pub fn model(&self) -> &IsolationForest {
        &self.model
    }

    /// Fit on `records` and score every one of them
    pub fn run(&mut self, records: &[MovementRecord]) -> Result<DetectionReport> {
        if records.is_empty() {
            return Err(StockForestError::EmptyDataset);
        }
        let start = Instant::now();

        let features = MovementFeatureBuilder::new(
            self.config.rolling_window,
            self.config.missing_category.clone(),
        )
        .build(records);

        let x = self.transform.fit_transform(&features)?;
        self.model.fit(&x)?;
        let detection = self.model.detect(&x)?;

        let selection = AnomalySelector::new(self.config.fallback_percentile).select(&detection);

        info!(
            n_records = records.len(),
            n_model_features = x.ncols(),
            n_labelled = detection.n_anomalies(),
            n_selected = selection.len(),
            fallback = selection.used_fallback(),
            elapsed = ?start.elapsed(),
            "Anomaly detection complete"
        );

        Ok(DetectionReport {
            features,
            n_model_features: x.ncols(),
            detection,
            selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records() -> Vec<MovementRecord> {
        (0..30)
            .map(|i| {
                let ts = NaiveDate::from_ymd_opt(2024, 1, 1 + (i % 28) as u32)
                    .unwrap()
                    .and_hms_opt(8 + (i % 3) as u32, 0, 0)
                    .unwrap();
                let qty = if i == 17 { 5000.0 } else { 10.0 + (i % 4) as f64 };
                MovementRecord::new(i, format!("ART-{}", i % 3))
                    .with_timestamp(ts)
                    .with_quantities(qty, qty)
                    .with_movement_type("SOR")
                    .with_document_type("BL")
            })
            .collect()
    }

    #[test]
    fn test_run_scores_every_record() {
        let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
        let report = pipeline.run(&records()).unwrap();

        assert_eq!(report.detection.len(), 30);
        assert_eq!(report.features.len(), 30);
        assert_eq!(report.n_model_features, pipeline.transform().n_features());
        assert!(pipeline.model().is_fitted());
        assert!(!report.selection.is_empty());
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
        assert!(matches!(pipeline.run(&[]), Err(StockForestError::EmptyDataset)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectionConfig::default().with_n_estimators(0);
        assert!(StockForestPipeline::new(config).is_err());
    }
}
