//! Console rendering of score distributions

pub mod histogram;
pub use histogram::ScoreHistogram;
