//! Error types for wrfout decoding.

use thiserror::Error;

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error types for reading and deriving fields from a wrfout file.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the NetCDF library
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// A variable the products need is not in the file
    #[error("missing variable {name}")]
    MissingVariable { name: String },

    /// A required attribute is not in the file
    #[error("missing attribute {name}")]
    MissingAttribute { name: String },

    /// A variable does not have the dimensions its reader expects
    #[error("variable {name}: expected {expected}, found {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: String,
        actual: Vec<usize>,
    },

    /// The Times axis is empty or undecodable
    #[error("bad Times entry: {0}")]
    BadTimes(String),

    /// Error from the shared grid and time types
    #[error(transparent)]
    Common(#[from] wrf_common::CommonError),
}
