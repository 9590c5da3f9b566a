pub mod color;
pub mod error;
pub mod escape;
pub mod geometry;
pub mod navigation;
pub mod session;

// Re-export primary types for convenience.
pub use color::{Color, ColorMap, ColorMapRegistry, ColorStop};
pub use error::CoreError;
pub use escape::{evaluate, EscapeParams, WeightedResult, DIVERGENCE_LIMIT};
pub use geometry::{lerp, map_point, Rect, Vector};
pub use session::{Session, Topic, ViewState};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
