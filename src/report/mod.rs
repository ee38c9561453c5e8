//! Summaries of a detection run for console reporting
//!
//! Everything here is computed from the pipeline output and never fed back
//! into detection.

use crate::anomaly::percentile;
use crate::pipeline::DetectionReport;
use crate::records::MovementRecord;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Descriptive statistics of the score distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1), NaN for a single score
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ScoreSummary {
    /// `None` for an empty score list
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        let count = scores.len();
        let q = |p: f64| percentile(scores, p);
        let mean = scores.iter().sum::<f64>() / count.max(1) as f64;
        let std = if count > 1 {
            (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Some(Self {
            count,
            mean,
            std,
            min: q(0.0)?,
            q25: q(25.0)?,
            median: q(50.0)?,
            q75: q(75.0)?,
            max: q(100.0)?,
        })
    }
}

/// Shape of a loaded movement log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_records: usize,
    pub n_entities: usize,
    pub n_missing_entities: usize,
    pub n_missing_timestamps: usize,
    pub n_missing_quantities: usize,
    pub first_movement: Option<NaiveDateTime>,
    pub last_movement: Option<NaiveDateTime>,
}

impl DatasetSummary {
    pub fn from_records(records: &[MovementRecord]) -> Self {
        let entities: BTreeSet<&str> = records.iter().filter_map(|r| r.entity()).collect();
        let timestamps = records.iter().filter_map(|r| r.timestamp);

        Self {
            n_records: records.len(),
            n_entities: entities.len(),
            n_missing_entities: records.iter().filter(|r| r.entity().is_none()).count(),
            n_missing_timestamps: records.iter().filter(|r| r.timestamp.is_none()).count(),
            n_missing_quantities: records.iter().filter(|r| r.quantity_pcu.is_none()).count(),
            first_movement: timestamps.clone().min(),
            last_movement: timestamps.max(),
        }
    }
}

/// One anomaly as shown in ranked listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRow {
    /// Source row in the movement log
    pub row: usize,
    pub article: String,
    pub timestamp: Option<NaiveDateTime>,
    pub quantity_pcu: f64,
    pub movement_type: String,
    pub score: f64,
    pub label: i32,
}

/// The `n` most anomalous selected records, lowest score first
pub fn top_anomalies(report: &DetectionReport, records: &[MovementRecord], n: usize) -> Vec<AnomalyRow> {
    let scores = report.scores();
    report
        .selection
        .top(&scores, n)
        .into_iter()
        .map(|p| anomaly_row(report, records, p))
        .collect()
}

/// Selected records in entity/time order, as exported
pub fn selected_rows(report: &DetectionReport, records: &[MovementRecord]) -> Vec<AnomalyRow> {
    let selected: BTreeSet<usize> = report.selection.indices.iter().copied().collect();
    report
        .features
        .order()
        .iter()
        .filter(|&&p| selected.contains(&p))
        .map(|&p| anomaly_row(report, records, p))
        .collect()
}

fn anomaly_row(report: &DetectionReport, records: &[MovementRecord], position: usize) -> AnomalyRow {
    let record = &records[position];
    let features = &report.features.features()[position];
    AnomalyRow {
        row: record.row,
        article: record.entity().unwrap_or_default().to_string(),
        timestamp: record.timestamp,
        quantity_pcu: features.quantity_pcu,
        movement_type: features.movement_type.clone(),
        score: report.detection.scores[position],
        label: report.detection.labels[position],
    }
}

/// Share of each movement type among the selected anomalies, largest first
pub fn movement_type_breakdown(report: &DetectionReport) -> Vec<(String, f64)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &p in &report.selection.indices {
        let movement_type = report.features.features()[p].movement_type.as_str();
        *counts.entry(movement_type).or_insert(0) += 1;
    }

    let total = report.selection.len().max(1) as f64;
    let mut shares: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(k, c)| (k.to_string(), c as f64 / total))
        .collect();
    shares.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    shares
}

/// Number of selected anomalies per calendar month (`YYYY-MM`), in month
/// order. Anomalies without a timestamp are not counted.
pub fn monthly_counts(report: &DetectionReport, records: &[MovementRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for &p in &report.selection.indices {
        if let Some(ts) = records[p].timestamp {
            *counts.entry((ts.year(), ts.month())).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|((year, month), n)| (format!("{:04}-{:02}", year, month), n))
        .collect()
}
