//! Loading movement logs and exporting selected anomalies

use crate::anomaly::NORMAL;
use crate::config::DetectionConfig;
use crate::error::{Result, StockForestError};
use crate::feature_engineering::{MovementFeatures, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use crate::pipeline::DetectionReport;
use crate::records::{
    parse_quantity, parse_timestamp, MovementRecord, COL_ARTICLE, COL_DOCUMENT_TYPE,
    COL_MOVEMENT_TYPE, COL_QUANTITY_PCU, COL_QUANTITY_STU, COL_STAT_TYPES, COL_TIMESTAMP,
};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Column holding the decision score in exported files
pub const COL_ANOMALY_SCORE: &str = "anomaly_score";
/// Column holding the model label in exported files
pub const COL_ANOMALY_LABEL: &str = "anomalie";

/// Raw frame as read from disk, plus the typed records parsed from it.
/// `records[i]` comes from row `i` of `frame`.
#[derive(Debug, Clone)]
pub struct MovementTable {
    pub frame: DataFrame,
    pub records: Vec<MovementRecord>,
}

impl MovementTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads a delimited movement log
#[derive(Debug, Clone)]
pub struct MovementLoader {
    separator: u8,
    timestamp_format: String,
}

impl Default for MovementLoader {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl MovementLoader {
    pub fn new(separator: u8, timestamp_format: impl Into<String>) -> Self {
        Self {
            separator,
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.input_separator as u8, config.timestamp_format.clone())
    }

    /// Load every row of `path`. Unparseable fields become missing values;
    /// an absent file, an absent required column or zero rows are errors.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<MovementTable> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StockForestError::DataError(format!(
                "input file not found: {}",
                path.display()
            )));
        }
        let start = Instant::now();

        let parse_opts = CsvParseOptions::default()
            .with_separator(self.separator)
            .with_encoding(CsvEncoding::LossyUtf8)
            .with_truncate_ragged_lines(true);

        // Schema inference is disabled so every column arrives as text
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let table = self.parse_frame(frame)?;
        info!(
            path = %path.display(),
            n_records = table.len(),
            n_columns = table.frame.width(),
            elapsed = ?start.elapsed(),
            "Loaded movement log"
        );
        Ok(table)
    }

    /// Parse records out of an already loaded frame
    pub fn parse_frame(&self, frame: DataFrame) -> Result<MovementTable> {
        if frame.height() == 0 {
            return Err(StockForestError::EmptyDataset);
        }

        let articles = required_text(&frame, COL_ARTICLE)?;
        let timestamps = required_text(&frame, COL_TIMESTAMP)?;
        let pcu = required_text(&frame, COL_QUANTITY_PCU)?;
        let stu = required_text(&frame, COL_QUANTITY_STU)?;
        let movement_types = required_text(&frame, COL_MOVEMENT_TYPE)?;
        let document_types = required_text(&frame, COL_DOCUMENT_TYPE)?;

        let mut stat_types: Vec<Vec<Option<String>>> = Vec::with_capacity(COL_STAT_TYPES.len());
        for name in COL_STAT_TYPES {
            let column = text_column(&frame, name)?.unwrap_or_else(|| {
                debug!(column = name, "Optional column absent, treating as missing");
                vec![None; frame.height()]
            });
            stat_types.push(column);
        }

        let records: Vec<MovementRecord> = (0..frame.height())
            .map(|row| MovementRecord {
                row,
                article: articles[row].clone(),
                timestamp: timestamps[row]
                    .as_deref()
                    .and_then(|raw| parse_timestamp(raw, &self.timestamp_format)),
                quantity_pcu: pcu[row].as_deref().and_then(parse_quantity),
                quantity_stu: stu[row].as_deref().and_then(parse_quantity),
                movement_type: movement_types[row].clone(),
                document_type: document_types[row].clone(),
                stat_types: std::array::from_fn(|slot| stat_types[slot][row].clone()),
            })
            .collect();

        let bad_timestamps = records.iter().filter(|r| r.timestamp.is_none()).count();
        let bad_quantities = records.iter().filter(|r| r.quantity_pcu.is_none()).count();
        if bad_timestamps > 0 || bad_quantities > 0 {
            warn!(
                bad_timestamps,
                bad_quantities,
                "Unparseable fields coerced to missing values"
            );
        }

        Ok(MovementTable { frame, records })
    }
}

fn text_column(frame: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let column = match frame.column(name) {
        Ok(column) => column,
        Err(_) => return Ok(None),
    };
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(Some(values))
}

fn required_text(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    text_column(frame, name)?.ok_or_else(|| StockForestError::FeatureNotFound(name.to_string()))
}

/// Result of an export attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// The anomaly set was empty, no file was created
    NothingToExport,
}

/// Writes the selected anomalies with original, derived and score columns
#[derive(Debug, Clone)]
pub struct AnomalyExporter {
    separator: u8,
}

impl Default for AnomalyExporter {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl AnomalyExporter {
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.output_separator as u8)
    }

    /// Write the anomaly set to `path`, or report that there is nothing to write
    pub fn write(
        &self,
        table: &MovementTable,
        report: &DetectionReport,
        path: impl AsRef<Path>,
    ) -> Result<ExportOutcome> {
        let path = path.as_ref();
        let mut frame = match self.anomaly_frame(table, report)? {
            Some(frame) => frame,
            None => {
                info!("Anomaly set is empty, nothing exported");
                return Ok(ExportOutcome::NothingToExport);
            }
        };

        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(self.separator)
            .finish(&mut frame)?;

        info!(path = %path.display(), rows = frame.height(), "Exported anomalies");
        Ok(ExportOutcome::Written {
            path: path.to_path_buf(),
            rows: frame.height(),
        })
    }

    /// Selected rows in entity/time order: source columns with normalized
    /// quantities and categories, derived features, score and label.
    /// `None` when nothing was selected.
    pub fn anomaly_frame(
        &self,
        table: &MovementTable,
        report: &DetectionReport,
    ) -> Result<Option<DataFrame>> {
        if report.selection.is_empty() {
            return Ok(None);
        }

        let mut selected = vec![false; table.len()];
        for &position in &report.selection.indices {
            selected[position] = true;
        }
        let positions: Vec<usize> = report
            .features
            .order()
            .iter()
            .copied()
            .filter(|&p| selected[p])
            .collect();

        let rows: Vec<IdxSize> = positions
            .iter()
            .map(|&p| table.records[p].row as IdxSize)
            .collect();
        let mut frame = table.frame.take(&IdxCa::from_vec("row".into(), rows))?;

        let features: Vec<&MovementFeatures> = positions
            .iter()
            .map(|&p| &report.features.features()[p])
            .collect();

        for (j, name) in NUMERIC_FEATURES.iter().enumerate() {
            let values: Vec<f64> = features.iter().map(|f| f.numeric()[j]).collect();
            frame.with_column(Series::new((*name).into(), values))?;
        }
        for (j, name) in CATEGORICAL_FEATURES.iter().enumerate() {
            let values: Vec<String> = features.iter().map(|f| f.categorical()[j].to_string()).collect();
            frame.with_column(Series::new((*name).into(), values))?;
        }

        let scores: Vec<f64> = positions.iter().map(|&p| report.detection.scores[p]).collect();
        let labels: Vec<i32> = positions
            .iter()
            .map(|&p| report.detection.labels.get(p).copied().unwrap_or(NORMAL))
            .collect();
        frame.with_column(Series::new(COL_ANOMALY_SCORE.into(), scores))?;
        frame.with_column(Series::new(COL_ANOMALY_LABEL.into(), labels))?;

        Ok(Some(frame))
    }
}
