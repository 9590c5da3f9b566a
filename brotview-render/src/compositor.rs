use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use brotview_core::{map_point, ColorMap, EscapeParams, Rect, Session, Vector, WeightedResult};

use crate::buffer::{fill_span, PixelBuffer};
use crate::error::RenderError;

/// Fill for points inside the set.
pub const MEMBER_RGBA: [u8; 4] = [0, 0, 0, 255];

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared cancellation token for render passes.
///
/// Each render captures the generation at start; if it changes mid-render
/// the pass is abandoned at the next band boundary. Progress belongs to one
/// generation at a time, so a stale pass still winding down cannot touch the
/// counts of the current one.
#[derive(Debug)]
pub struct RenderCancel {
    generation: AtomicU64,
    progress_generation: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl RenderCancel {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            progress_generation: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Advance the generation and return the new value. Every pass started
    /// under an older generation becomes stale.
    pub fn cancel(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Reset progress for a new pass of `generation` with `total` bands.
    /// Ignored when `generation` is already stale.
    pub fn reset_progress(&self, generation: u64, total: usize) {
        if !self.is_current(generation) {
            return;
        }
        self.progress_generation.store(generation, Ordering::SeqCst);
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    /// Count one finished band of `generation`. Ignored unless `generation`
    /// owns the progress counters.
    pub fn inc_progress(&self, generation: u64) {
        if self.progress_generation.load(Ordering::SeqCst) == generation {
            self.progress_done.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Progress of the current pass as `(done, total)` bands.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything one pass needs, snapshotted so it can cross threads.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub width: u32,
    pub height: u32,
    /// Region of the complex plane mapped onto the buffer.
    pub plane_rect: Rect,
    /// Edge length of the square blocks that share one evaluation.
    pub block_size: u32,
    pub params: EscapeParams,
    pub color_map: ColorMap,
}

impl RenderRequest {
    pub fn new(
        width: u32,
        height: u32,
        plane_rect: Rect,
        block_size: u32,
        params: EscapeParams,
        color_map: ColorMap,
    ) -> crate::Result<Self> {
        let request = Self {
            width,
            height,
            plane_rect,
            block_size,
            params,
            color_map,
        };
        request.validate()?;
        Ok(request)
    }

    /// Snapshot the session's view for a `width × height` buffer.
    pub fn from_session(
        session: &Session,
        width: u32,
        height: u32,
        block_size: u32,
    ) -> crate::Result<Self> {
        Self::new(
            width,
            height,
            session.rect(),
            block_size,
            session.state().escape_params(),
            session.color_map().clone(),
        )
    }

    /// The same request at a different block size.
    pub fn with_block_size(&self, block_size: u32) -> Self {
        Self {
            block_size,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.block_size == 0 {
            return Err(RenderError::InvalidBlockSize(self.block_size));
        }
        self.plane_rect.validate()?;
        self.params.validate()?;
        Ok(())
    }

    fn band_count(&self) -> usize {
        self.height.div_ceil(self.block_size) as usize
    }
}

// ---------------------------------------------------------------------------
// Rasterizer
// ---------------------------------------------------------------------------

#[inline]
fn block_color(result: WeightedResult, color_map: &ColorMap) -> [u8; 4] {
    match result {
        WeightedResult::Member => MEMBER_RGBA,
        escaped => color_map.sample_cyclic(escaped.weight()).to_rgba8(),
    }
}

/// Render one band: the row of blocks whose top edge is pixel row `py`.
fn render_band(request: &RenderRequest, pixel_rect: &Rect, py: u32, band: &mut [u8]) {
    let block = request.block_size;
    let mut px = 0;
    while px < request.width {
        let c = map_point(
            Vector::new(px as f64, py as f64),
            pixel_rect,
            &request.plane_rect,
        );
        let rgba = block_color(request.params.evaluate(c), &request.color_map);
        let len = block.min(request.width - px);
        fill_span(band, request.width, px, len, rgba);
        px += block;
    }
}

/// Render one full pass.
///
/// Each `block_size × block_size` block (clipped at the right and bottom
/// edges) takes the color of its top-left pixel's plane point.
pub fn render_tile(request: &RenderRequest) -> crate::Result<PixelBuffer> {
    let cancel = RenderCancel::new();
    let generation = cancel.generation();
    render_tile_cancellable(request, &cancel, generation).map(|buffer| {
        // The token is local, so nothing can advance it.
        buffer.unwrap_or_else(|| PixelBuffer::new(request.width, request.height))
    })
}

/// Render one full pass, abandoning it at the next band boundary once
/// `cancel` moves past `generation`.
///
/// Returns `Ok(None)` when the pass was superseded.
pub fn render_tile_cancellable(
    request: &RenderRequest,
    cancel: &RenderCancel,
    generation: u64,
) -> crate::Result<Option<PixelBuffer>> {
    request.validate()?;
    let start = Instant::now();

    let mut buffer = PixelBuffer::new(request.width, request.height);
    let pixel_rect = buffer.rect();
    let band_bytes = buffer.stride() * request.block_size as usize;
    cancel.reset_progress(generation, request.band_count());

    buffer
        .pixels
        .par_chunks_mut(band_bytes)
        .enumerate()
        .for_each(|(index, band)| {
            if !cancel.is_current(generation) {
                return;
            }
            let py = index as u32 * request.block_size;
            render_band(request, &pixel_rect, py, band);
            cancel.inc_progress(generation);
        });

    if !cancel.is_current(generation) {
        debug!(
            generation,
            block_size = request.block_size,
            "Pass abandoned"
        );
        return Ok(None);
    }

    debug!(
        generation,
        block_size = request.block_size,
        width = request.width,
        height = request.height,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Pass complete"
    );
    Ok(Some(buffer))
}
