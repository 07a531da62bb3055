//! Error type for the rendering crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("unknown color ramp '{0}'")]
    UnknownRamp(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
