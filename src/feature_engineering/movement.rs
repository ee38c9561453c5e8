//! Per-entity windowed features over time-ordered stock movements

use crate::records::MovementRecord;
use chrono::Timelike;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the numeric feature columns, in matrix order
pub const NUMERIC_FEATURES: [&str; 7] = [
    "Quantite_PCU",
    "Quantite_STU",
    "Delai_entre_mouvements",
    "Variation_Quantite",
    "Moyenne_mobile_Quantite",
    "Variation_Pourcentage",
    "Heure_Mouvement",
];

/// Names of the categorical feature columns, in matrix order
pub const CATEGORICAL_FEATURES: [&str; 7] = [
    "Type_Mouvement",
    "Type_Piece",
    "Type_Statistique_0",
    "Type_Statistique_1",
    "Type_Statistique_2",
    "Type_Statistique_3",
    "Type_Statistique_4",
];

/// Derived features of a single movement. Every numeric field is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementFeatures {
    /// Source row of the record
    pub row: usize,
    pub quantity_pcu: f64,
    pub quantity_stu: f64,
    /// Whole days since the previous movement of the same entity
    pub days_since_previous: f64,
    /// Primary quantity minus the previous one
    pub quantity_delta: f64,
    /// Mean primary quantity over the trailing window
    pub rolling_mean_quantity: f64,
    /// (current - previous) / previous
    pub pct_change: f64,
    pub hour: f64,
    pub movement_type: String,
    pub document_type: String,
    pub stat_types: [String; 5],
}

impl MovementFeatures {
    /// Numeric values in [`NUMERIC_FEATURES`] order
    pub fn numeric(&self) -> [f64; 7] {
        [
            self.quantity_pcu,
            self.quantity_stu,
            self.days_since_previous,
            self.quantity_delta,
            self.rolling_mean_quantity,
            self.pct_change,
            self.hour,
        ]
    }

    /// Categorical values in [`CATEGORICAL_FEATURES`] order
    pub fn categorical(&self) -> [&str; 7] {
        [
            &self.movement_type,
            &self.document_type,
            &self.stat_types[0],
            &self.stat_types[1],
            &self.stat_types[2],
            &self.stat_types[3],
            &self.stat_types[4],
        ]
    }
}

/// Features for a whole corpus.
///
/// `features()[i]` belongs to the i-th input record; `order()` lists record
/// positions grouped by entity and sorted by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    features: Vec<MovementFeatures>,
    order: Vec<usize>,
}

impl FeatureTable {
    pub fn features(&self) -> &[MovementFeatures] {
        &self.features
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn get(&self, position: usize) -> Option<&MovementFeatures> {
        self.features.get(position)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Windowed values computed from an entity's ordered sequence
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct SequenceFeatures {
    days_since_previous: f64,
    quantity_delta: f64,
    rolling_mean_quantity: f64,
    pct_change: f64,
}

/// Builds [`MovementFeatures`] from raw records
#[derive(Debug, Clone)]
pub struct MovementFeatureBuilder {
    window: usize,
    missing_category: String,
}

impl Default for MovementFeatureBuilder {
    fn default() -> Self {
        Self::new(3, "ZZZZZ")
    }
}

impl MovementFeatureBuilder {
    /// Create a builder with a rolling `window` (at least 1) and the sentinel
    /// used for missing categories
    pub fn new(window: usize, missing_category: impl Into<String>) -> Self {
        Self {
            window: window.max(1),
            missing_category: missing_category.into(),
        }
    }

    /// Compute features for every record
    pub fn build(&self, records: &[MovementRecord]) -> FeatureTable {
        let (groups, orphans) = group_by_entity(records);
        let per_record = self.windowed_features(records, &groups);

        let features = records
            .iter()
            .zip(per_record)
            .map(|(record, windowed)| self.finalize(record, windowed))
            .collect();

        let order = groups
            .into_iter()
            .flatten()
            .chain(orphans)
            .collect();

        FeatureTable { features, order }
    }

    /// Windowed values for every record, computed per entity in parallel and
    /// scattered back by record position
    fn windowed_features(
        &self,
        records: &[MovementRecord],
        groups: &[Vec<usize>],
    ) -> Vec<SequenceFeatures> {
        let windowed: Vec<Vec<SequenceFeatures>> = groups
            .par_iter()
            .map(|positions| {
                let sequence: Vec<&MovementRecord> =
                    positions.iter().map(|&p| &records[p]).collect();
                sequence_features(&sequence, self.window)
            })
            .collect();

        // Records without an entity have no sequence; their windowed values stay 0
        let mut per_record = vec![SequenceFeatures::default(); records.len()];
        for (positions, values) in groups.iter().zip(windowed) {
            for (&position, value) in positions.iter().zip(values) {
                per_record[position] = value;
            }
        }
        per_record
    }

    fn finalize(&self, record: &MovementRecord, windowed: SequenceFeatures) -> MovementFeatures {
        let hour = record
            .timestamp
            .map(|ts| ts.hour() as f64)
            .unwrap_or(0.0);

        MovementFeatures {
            row: record.row,
            quantity_pcu: finite_or_zero(record.quantity_pcu),
            quantity_stu: finite_or_zero(record.quantity_stu),
            days_since_previous: finite_or_zero(Some(windowed.days_since_previous)),
            quantity_delta: finite_or_zero(Some(windowed.quantity_delta)),
            rolling_mean_quantity: finite_or_zero(Some(windowed.rolling_mean_quantity)),
            pct_change: finite_or_zero(Some(windowed.pct_change)),
            hour,
            movement_type: self.category(&record.movement_type),
            document_type: self.category(&record.document_type),
            stat_types: std::array::from_fn(|i| self.category(&record.stat_types[i])),
        }
    }

    fn category(&self, value: &Option<String>) -> String {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => self.missing_category.clone(),
        }
    }
}

/// Partition record positions by entity, each partition sorted by timestamp
/// (missing timestamps last, ties in source order).
///
/// Partitions come back in entity-key order; records without an entity are
/// returned separately in source order.
fn group_by_entity(records: &[MovementRecord]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut orphans = Vec::new();

    for (position, record) in records.iter().enumerate() {
        match record.entity() {
            Some(entity) => groups.entry(entity).or_default().push(position),
            None => orphans.push(position),
        }
    }

    let groups = groups
        .into_values()
        .map(|mut positions| {
            // sort_by_key is stable, so equal timestamps keep source order
            positions.sort_by_key(|&p| {
                let ts = records[p].timestamp;
                (ts.is_none(), ts)
            });
            positions
        })
        .collect();

    (groups, orphans)
}

/// Windowed features of one entity's time-ordered sequence. Missing inputs
/// yield NaN, zero-filled by the caller.
fn sequence_features(sequence: &[&MovementRecord], window: usize) -> Vec<SequenceFeatures> {
    let quantities: Vec<Option<f64>> = sequence.iter().map(|r| r.quantity_pcu).collect();

    sequence
        .iter()
        .enumerate()
        .map(|(k, record)| {
            if k == 0 {
                return SequenceFeatures {
                    rolling_mean_quantity: rolling_mean(&quantities[..1]),
                    ..SequenceFeatures::default()
                };
            }
            let previous = sequence[k - 1];

            let days_since_previous = match (record.timestamp, previous.timestamp) {
                (Some(current), Some(prior)) => (current - prior).num_days() as f64,
                _ => f64::NAN,
            };

            let quantity_delta = match (quantities[k], quantities[k - 1]) {
                (Some(current), Some(prior)) => current - prior,
                _ => f64::NAN,
            };

            let pct_change = match (quantities[k], quantities[k - 1]) {
                (Some(current), Some(prior)) if prior != 0.0 => (current - prior) / prior,
                _ => 0.0,
            };

            let start = (k + 1).saturating_sub(window);
            SequenceFeatures {
                days_since_previous,
                quantity_delta,
                rolling_mean_quantity: rolling_mean(&quantities[start..=k]),
                pct_change,
            }
        })
        .collect()
}

/// Mean of the present values, NaN when none are present
fn rolling_mean(values: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return f64::NAN;
    }
    present.iter().sum::<f64>() / present.len() as f64
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}
