use brotview_core::Rect;

use crate::error::RenderError;

/// An RGBA pixel buffer representing a rendered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel, row-major order.
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a new buffer filled with black (opaque).
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Pixel-space rectangle `{0, 0, width, height}`.
    pub fn rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    fn index(&self, x: u32, y: u32) -> crate::Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(RenderError::PixelOutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.stride() + x as usize * 4)
    }

    /// Read one pixel. Out-of-range coordinates are an error, never clamped.
    pub fn get_pixel(&self, x: u32, y: u32) -> crate::Result<[u8; 4]> {
        let i = self.index(x, y)?;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[i..i + 4]);
        Ok(rgba)
    }

    /// Write one pixel. Out-of-range coordinates are an error, never clamped.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) -> crate::Result<()> {
        let i = self.index(x, y)?;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
        Ok(())
    }
}

/// Fill columns `x..x + len` of every row in `band` with `rgba`.
///
/// `band` is a whole number of rows of a buffer `width` pixels wide.
#[inline]
pub(crate) fn fill_span(band: &mut [u8], width: u32, x: u32, len: u32, rgba: [u8; 4]) {
    let stride = width as usize * 4;
    let start = x as usize * 4;
    let end = start + len as usize * 4;
    for row in band.chunks_exact_mut(stride) {
        for px in row[start..end].chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}
