use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the normalizer boundary.
///
/// A rejected call never mutates the normalizer: validation always runs to
/// completion before any statistic is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizerError {
    #[error("shape mismatch: got {actual} dimensions, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("invalid statistics: std[{index}] = {value} must be positive and finite")]
    InvalidStatistics { index: usize, value: f64 },
    #[error("non-finite sample: row {row}, dimension {index} = {value}")]
    NonFiniteSample { row: usize, index: usize, value: f64 },
    #[error("non-finite mean: mean[{index}] = {value}")]
    NonFiniteMean { index: usize, value: f64 },
    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

impl NormalizerError {
    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch { expected, actual })
        }
    }
}

/// Errors raised while persisting or restoring normalizer records.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access statistics file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed statistics file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot restore normalizer `{name}`: {source}")]
    Normalizer {
        name: String,
        #[source]
        source: NormalizerError,
    },
}
