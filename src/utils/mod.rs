//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    AnomalyExporter, ExportOutcome, MovementLoader, MovementTable, COL_ANOMALY_LABEL,
    COL_ANOMALY_SCORE,
};
