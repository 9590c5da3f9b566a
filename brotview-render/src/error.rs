use thiserror::Error;

/// Errors originating from the rendering pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("invalid image dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid block size: {0} (must be >= 1)")]
    InvalidBlockSize(u32),

    #[error("pixel ({x}, {y}) is outside the {width}×{height} buffer")]
    PixelOutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Core(#[from] brotview_core::CoreError),
}
