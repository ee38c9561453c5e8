//! Preprocessing of derived movement features
//!
//! Turns the mixed numeric/categorical feature sets into fixed-width numeric
//! vectors:
//! - Standard scaling of the numeric features
//! - One-hot encoding of the categorical features, unknown categories ignored

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use pipeline::MovementTransform;
pub use scaler::StandardScaler;
