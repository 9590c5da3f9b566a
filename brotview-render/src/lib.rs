pub mod buffer;
pub mod compositor;
pub mod error;
pub mod scheduler;

pub use buffer::PixelBuffer;
pub use compositor::{render_tile, render_tile_cancellable, RenderCancel, RenderRequest, MEMBER_RGBA};
pub use error::RenderError;
pub use scheduler::{
    next_block_size, run_passes, CycleState, RenderJob, RenderProgress, RepaintNotifier, Scheduler,
};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
