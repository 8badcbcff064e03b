//! Error types for htcsim

use thiserror::Error;

/// htcsim error type
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HtcError {
    /// Parameter outside its valid domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shape mismatch
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Series never crosses its reference level
    #[error("Degenerate series: {0}")]
    DegenerateSeries(String),

    /// Log-ratio of non-positive or non-finite values
    #[error("Undefined ratio: {0}")]
    UndefinedRatio(String),

    /// Reduction over no data
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),
}

impl HtcError {
    /// Shorthand for a shape mismatch
    pub(crate) fn shape(expected: &[usize], actual: &[usize]) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HtcError>;
