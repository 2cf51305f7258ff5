//! Error taxonomy for the load → resolve → analyse pipeline.
//!
//! Every variant is recoverable: the render boundary in [`crate::pipeline`]
//! turns them into user-visible messages.

use thiserror::Error;

/// Failures of the tabular data loader.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("the uploaded file contains no data rows")]
    EmptyInput,

    #[error("malformed delimited text at line {line}: expected {expected} fields, found {found}")]
    MalformedInput {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("malformed delimited text: {0}")]
    Unparseable(String),

    #[error("could not decode the upload as UTF-8 or {encoding}")]
    Decode { encoding: String },
}

/// Failures of the axis resolver.
#[derive(Debug, Error, PartialEq)]
pub enum AxisError {
    #[error("column {0:?} does not exist")]
    UnknownColumn(String),

    #[error("column {column:?} is {kind}, a numeric column is required")]
    NonNumericAxis { column: String, kind: &'static str },
}

/// Failures of the peak annotator.
#[derive(Debug, Error, PartialEq)]
pub enum PeakError {
    #[error("{values} values but {positions} positions")]
    LengthMismatch { values: usize, positions: usize },

    #[error("non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("prominence factor must be finite and non-negative, got {0}")]
    InvalidFactor(f64),
}

/// Anything that can stop a single render pass.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Axis(#[from] AxisError),

    #[error("peak computation failed: {0}")]
    Peak(#[from] PeakError),
}
