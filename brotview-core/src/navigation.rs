//! Pure view-rectangle transforms behind pointer, wheel and resize input.
//!
//! All functions take the current plane rectangle and return a new one; the
//! caller hands the result to [`Session::set_rect`](crate::Session::set_rect),
//! which rejects anything that degenerated along the way.

use crate::geometry::{map_point, Rect, Vector};

/// Base of the wheel zoom: one wheel line scales the view by 1.5.
pub const ZOOM_BASE: f64 = 1.5;

/// Pan so that the content follows a pointer drag of `delta_px` over a
/// viewport of `viewport_px` pixels.
pub fn pan(rect: &Rect, delta_px: Vector, viewport_px: Vector) -> Rect {
    Rect {
        x: rect.x - delta_px.x / viewport_px.x * rect.w,
        y: rect.y - delta_px.y / viewport_px.y * rect.h,
        ..*rect
    }
}

/// Zoom by `ZOOM_BASE^delta_lines` keeping the plane point under `cursor_px`
/// fixed. Positive deltas zoom out.
pub fn zoom_at(rect: &Rect, cursor_px: Vector, viewport: &Rect, delta_lines: f64) -> Rect {
    let factor = ZOOM_BASE.powf(delta_lines);
    let anchor = map_point(cursor_px, viewport, rect);
    let origin = anchor - (anchor - Vector::new(rect.x, rect.y)) * factor;
    Rect {
        x: origin.x,
        y: origin.y,
        w: rect.w * factor,
        h: rect.h * factor,
    }
}

/// Scale both extents by `factor` around the centre.
pub fn zoom_center(rect: &Rect, factor: f64) -> Rect {
    let center = rect.center();
    let (w, h) = (rect.w * factor, rect.h * factor);
    Rect {
        x: center.x - w / 2.0,
        y: center.y - h / 2.0,
        w,
        h,
    }
}

/// Keep the centre and width, and set the height so the plane rectangle
/// has the same aspect ratio as a `width_px × height_px` panel.
pub fn fit_aspect(rect: &Rect, width_px: u32, height_px: u32) -> Rect {
    if width_px == 0 || height_px == 0 {
        return *rect;
    }
    let center = rect.center();
    let h = rect.w * height_px as f64 / width_px as f64;
    Rect {
        x: rect.x,
        y: center.y - h / 2.0,
        w: rect.w,
        h,
    }
}
