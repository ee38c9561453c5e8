//! Feature engineering over stock movement sequences
//!
//! Records are grouped by stock item, ordered by time, and each sequence is
//! mapped to windowed features (gap since previous movement, quantity delta,
//! rolling mean, percentage change) plus the hour of day.

mod movement;

pub use movement::{
    FeatureTable, MovementFeatureBuilder, MovementFeatures, CATEGORICAL_FEATURES,
    NUMERIC_FEATURES,
};
