//! Integration tests: detection runs over in-memory movement logs

use chrono::{NaiveDate, NaiveDateTime};
use stockforest::anomaly::{SelectionStrategy, ANOMALY};
use stockforest::config::DetectionConfig;
use stockforest::pipeline::StockForestPipeline;
use stockforest::records::MovementRecord;

fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn movement(row: usize, article: &str, day: u32, qty: f64) -> MovementRecord {
    MovementRecord::new(row, article)
        .with_timestamp(ts(day, 9))
        .with_quantities(qty, 1.0)
        .with_movement_type("SOR")
        .with_document_type("BL")
}

/// 60 routine movements spread over 4 articles, plus one huge receipt
fn warehouse_log() -> Vec<MovementRecord> {
    let mut records: Vec<MovementRecord> = (0..60)
        .map(|i| {
            let article = format!("ART-{}", i % 4);
            movement(i, &article, 1 + (i / 4) as u32, 20.0 + (i % 5) as f64)
        })
        .collect();
    records.push(
        MovementRecord::new(60, "ART-2")
            .with_timestamp(ts(20, 3))
            .with_quantities(90_000.0, 500.0)
            .with_movement_type("ENT")
            .with_document_type("INV"),
    );
    records
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_isolated_article_is_flagged() {
    let records = vec![
        movement(0, "A", 1, 10.0),
        movement(1, "A", 2, 10.0),
        movement(2, "A", 3, 10.0),
        movement(3, "B", 1, 10_000.0),
    ];

    let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
    let report = pipeline.run(&records).unwrap();
    let scores = report.scores();

    assert!(scores[..3].iter().all(|&s| scores[3] < s));
    assert_eq!(report.detection.labels[3], ANOMALY);
    assert!(report.selection.indices.contains(&3));
    assert_eq!(report.selection.strategy, SelectionStrategy::Primary);
}

#[test]
fn test_identical_corpus_uses_fallback() {
    let records: Vec<MovementRecord> = (0..20)
        .map(|i| movement(i, &format!("ART-{}", i), 1, 5.0))
        .collect();

    let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
    let report = pipeline.run(&records).unwrap();

    assert_eq!(report.detection.n_anomalies(), 0);
    assert!(report.selection.used_fallback());
    // Every score ties with the percentile threshold
    assert_eq!(report.selection.len(), records.len());
    assert_eq!(report.selection.threshold, Some(0.0));
}

// ============================================================================
// Pipeline behaviour
// ============================================================================

#[test]
fn test_outlier_ranks_first() {
    let records = warehouse_log();
    let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
    let report = pipeline.run(&records).unwrap();

    let top = report.selection.top(&report.scores(), 1);
    assert_eq!(top, vec![60]);
    assert_eq!(report.selection.strategy, SelectionStrategy::Primary);
}

#[test]
fn test_same_seed_same_scores() {
    let records = warehouse_log();
    let config = DetectionConfig::default().with_seed(7);

    let first = StockForestPipeline::new(config.clone()).unwrap().run(&records).unwrap();
    let second = StockForestPipeline::new(config).unwrap().run(&records).unwrap();

    assert_eq!(first.scores(), second.scores());
    assert_eq!(first.selection.indices, second.selection.indices);
}

#[test]
fn test_labels_follow_decision_sign() {
    let records = warehouse_log();
    let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
    let report = pipeline.run(&records).unwrap();

    for (score, label) in report.detection.scores.iter().zip(report.detection.labels.iter()) {
        assert_eq!(*label == ANOMALY, *score < 0.0);
    }
}

#[test]
fn test_contamination_bounds_labelled_share() {
    let records = warehouse_log();
    let config = DetectionConfig::default().with_contamination(0.1);
    let report = StockForestPipeline::new(config).unwrap().run(&records).unwrap();

    // At most ceil(10% of 61) records fall strictly below the offset
    assert!(report.detection.n_anomalies() <= 7);
    assert!(report.detection.n_anomalies() >= 1);
}

#[test]
fn test_extreme_quantities_complete() {
    let mut records: Vec<MovementRecord> = (0..20)
        .map(|i| movement(i, &format!("ART-{}", i % 2), 1 + i as u32, 10.0))
        .collect();
    records.push(movement(20, "ART-8", 1, 1.5e308));
    records.push(movement(21, "ART-9", 1, -1.5e308));

    let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
    let report = pipeline.run(&records).unwrap();

    assert_eq!(report.detection.len(), 22);
    assert!(report.scores().iter().all(|s| s.is_finite()));
    assert!(!report.selection.is_empty());
}

#[test]
fn test_matrix_width_matches_vocabulary() {
    let records = warehouse_log();
    let mut pipeline = StockForestPipeline::new(DetectionConfig::default()).unwrap();
    let report = pipeline.run(&records).unwrap();

    // 7 numeric + {ENT, SOR} + {BL, INV} + 5 sentinel-only statistic columns
    assert_eq!(report.n_model_features, 7 + 2 + 2 + 5);
    assert_eq!(pipeline.transform().feature_names().len(), report.n_model_features);
}
