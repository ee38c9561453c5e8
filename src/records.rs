//! Stock movement records and field parsing

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column holding the stock item identifier
pub const COL_ARTICLE: &str = "Article";
/// Column holding the movement timestamp
pub const COL_TIMESTAMP: &str = "Date_Mouvement";
/// Primary quantity column
pub const COL_QUANTITY_PCU: &str = "Quantite_PCU";
/// Secondary quantity column
pub const COL_QUANTITY_STU: &str = "Quantite_STU";
/// Movement type category
pub const COL_MOVEMENT_TYPE: &str = "Type_Mouvement";
/// Document type category
pub const COL_DOCUMENT_TYPE: &str = "Type_Piece";
/// Auxiliary statistical type categories
pub const COL_STAT_TYPES: [&str; 5] = [
    "Type_Statistique_0",
    "Type_Statistique_1",
    "Type_Statistique_2",
    "Type_Statistique_3",
    "Type_Statistique_4",
];

/// One stock transaction as loaded from the movement log.
///
/// Fields that failed to parse are `None`; nothing is dropped at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    /// Zero-based row in the source file
    pub row: usize,
    pub article: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub quantity_pcu: Option<f64>,
    pub quantity_stu: Option<f64>,
    pub movement_type: Option<String>,
    pub document_type: Option<String>,
    pub stat_types: [Option<String>; 5],
}

impl MovementRecord {
    /// Create an empty record for `article` at source row `row`
    pub fn new(row: usize, article: impl Into<String>) -> Self {
        Self {
            row,
            article: Some(article.into()),
            timestamp: None,
            quantity_pcu: None,
            quantity_stu: None,
            movement_type: None,
            document_type: None,
            stat_types: Default::default(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_quantities(mut self, pcu: f64, stu: f64) -> Self {
        self.quantity_pcu = Some(pcu);
        self.quantity_stu = Some(stu);
        self
    }

    pub fn with_movement_type(mut self, value: impl Into<String>) -> Self {
        self.movement_type = Some(value.into());
        self
    }

    pub fn with_document_type(mut self, value: impl Into<String>) -> Self {
        self.document_type = Some(value.into());
        self
    }

    pub fn with_stat_type(mut self, slot: usize, value: impl Into<String>) -> Self {
        if let Some(field) = self.stat_types.get_mut(slot) {
            *field = Some(value.into());
        }
        self
    }

    /// Entity key, `None` when the identifier is missing or blank
    pub fn entity(&self) -> Option<&str> {
        self.article.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Parse a quantity written with either a decimal comma or a decimal point.
///
/// Returns `None` for blank, non-numeric and NaN input. Infinities are kept
/// and zero-filled later by the feature builder.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a movement timestamp, `None` when it does not match `format`
pub fn parse_timestamp(raw: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), format).ok()
}
