//! Error type for profile analysis.

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failure modes for parcel and index calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A profile required for the analysis was never supplied.
    #[error("missing profile required for the analysis")]
    MissingProfile,

    /// The profiles exist but hold too few valid levels.
    #[error("not enough valid data for the analysis")]
    NotEnoughData,

    /// Input outside the range the calculation can handle.
    #[error("invalid input")]
    InvalidInput,

    /// The target level falls outside the sounding.
    #[error("interpolation target outside the profile")]
    InterpolationError,

    /// A thermodynamic formula returned no value.
    #[error("thermodynamic formula failed")]
    MetForError,
}
