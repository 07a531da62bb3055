//! Error types shared across the wrf-products workspace.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors from the shared grid/time/config types.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("grid shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("grid dimensions differ: {a_ny}x{a_nx} vs {b_ny}x{b_nx}")]
    DimensionMismatch {
        a_ny: usize,
        a_nx: usize,
        b_ny: usize,
        b_nx: usize,
    },

    #[error("invalid model init time: {0}")]
    InvalidInitTime(String),

    #[error("cannot determine domain from file name: {0}")]
    BadDomain(String),
}
