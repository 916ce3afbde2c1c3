//! Pipeline configuration.

pub mod v1;

pub use v1::{parse_bool, parse_deltas, PipelineConfig};

use crate::similarity::UnknownSimilarity;

/// Error type for configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// δ outside (0, 1].
    #[error("Invalid delta {0}: must be in (0, 1]")]
    InvalidDelta(f64),

    /// Merge threshold outside [0, 1].
    #[error("Invalid merge threshold {0}: must be in [0, 1]")]
    InvalidMergeThreshold(f64),

    /// Unknown similarity variant.
    #[error(transparent)]
    UnknownSimilarity(#[from] UnknownSimilarity),

    /// Environment variable that does not parse.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
    },
}
