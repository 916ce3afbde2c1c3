//! Pipeline configuration v1.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing so that `params_hash`
//! does not depend on float formatting. The quantization factor is 1e6
//! (multiply by 1,000,000 and round to i64).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::canonical::canonical_hash_hex;
use crate::similarity::{Similarity, SimilarityKind};
use crate::DEFAULT_CONFIG_VERSION;

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Quantized parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize)]
struct QuantizedParams<'a> {
    version: &'a str,
    similarity: SimilarityKind,
    delta: i64,
    merge_threshold: i64,
}

/// Configuration of one pipeline run.
///
/// ## Parameters
///
/// - `similarity`: relation classifier variant
/// - `delta`: coverage threshold δ in (0, 1] (ignored by Exact)
/// - `merge_threshold`: minimum sibling overlap for expansion merges
/// - `parallel`: process components on the rayon pool
/// - `verify`: check containment and single assignment after each stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Configuration version identifier.
    pub version: String,
    /// Similarity variant.
    pub similarity: SimilarityKind,
    /// Coverage threshold δ.
    pub delta: f64,
    /// Minimum overlap ratio for sibling merges.
    pub merge_threshold: f64,
    /// Whether components run in parallel.
    pub parallel: bool,
    /// Whether tree invariants are verified.
    pub verify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CONFIG_VERSION.to_string(),
            similarity: SimilarityKind::Jaccard,
            delta: 0.95,
            merge_threshold: 0.01,
            parallel: true,
            verify: true,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default switches.
    pub fn new(similarity: SimilarityKind, delta: f64, merge_threshold: f64) -> Self {
        Self {
            similarity,
            delta,
            merge_threshold,
            ..Self::default()
        }
    }

    /// Copy of this configuration with another δ.
    pub fn with_delta(&self, delta: f64) -> Self {
        Self {
            delta,
            ..self.clone()
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.delta > 0.0 && self.delta <= 1.0) {
            return Err(ConfigError::InvalidDelta(self.delta));
        }
        if !(0.0..=1.0).contains(&self.merge_threshold) {
            return Err(ConfigError::InvalidMergeThreshold(self.merge_threshold));
        }
        Ok(())
    }

    /// The configured similarity function.
    pub fn similarity_function(&self) -> Similarity {
        Similarity::new(self.similarity, self.delta)
    }

    /// Hash of the algorithmic parameters.
    ///
    /// Execution switches (`parallel`, `verify`) do not change results and
    /// are left out.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&QuantizedParams {
            version: &self.version,
            similarity: self.similarity,
            delta: quantize_float(self.delta),
            merge_threshold: quantize_float(self.merge_threshold),
        })
    }

    /// Load overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through `lookup`.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `OCT_SIMILARITY` | `similarity` |
    /// | `OCT_DELTA` | `delta` |
    /// | `OCT_MERGE_THRESHOLD` | `merge_threshold` |
    /// | `OCT_PARALLEL` | `parallel` |
    /// | `OCT_VERIFY` | `verify` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup("OCT_SIMILARITY") {
            config.similarity = v.parse()?;
        }
        if let Some(v) = lookup("OCT_DELTA") {
            config.delta = parse_float("OCT_DELTA", &v)?;
        }
        if let Some(v) = lookup("OCT_MERGE_THRESHOLD") {
            config.merge_threshold = parse_float("OCT_MERGE_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("OCT_PARALLEL") {
            config.parallel = parse_bool("OCT_PARALLEL", &v)?;
        }
        if let Some(v) = lookup("OCT_VERIFY") {
            config.verify = parse_bool("OCT_VERIFY", &v)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse a comma-separated δ list such as `0.8,0.9,0.95`.
pub fn parse_deltas(raw: &str) -> Result<Vec<f64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_float("OCT_DELTAS", s))
        .collect()
}

fn parse_float(name: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Parse a boolean switch.
pub fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
