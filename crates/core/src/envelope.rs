//! Request envelopes and the pixel-buffer calculator.
//!
//! Symbols drawn near a tile edge (wide strokes, point markers, halos) bleed
//! over the edge by up to half their size. Features just outside the tile must
//! therefore survive clipping, so the request envelope is grown by a buffer
//! expressed in pixels and converted here to ground units.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Buffer in pixels used when the style does not declare one
pub const DEFAULT_BUFFER_PIXELS: f64 = 0.0;

/// Axis-aligned rectangle in the CRS of the geometries being clipped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check if this is a valid (finite, non-inverted) envelope
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Grow every side by `buffer` ground units.
    pub fn buffered(&self, buffer: f64) -> Self {
        Self::new(
            self.min_x - buffer,
            self.min_y - buffer,
            self.max_x + buffer,
            self.max_y + buffer,
        )
    }

    /// Boundary-inclusive containment test
    pub fn contains_coord(&self, c: &Coord<f64>) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    /// True if the rectangle touches or overlaps this envelope
    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        rect.max().x >= self.min_x
            && rect.min().x <= self.max_x
            && rect.max().y >= self.min_y
            && rect.min().y <= self.max_y
    }

    /// True if the rectangle lies entirely inside (or on) this envelope
    pub fn contains_rect(&self, rect: &Rect<f64>) -> bool {
        rect.min().x >= self.min_x
            && rect.max().x <= self.max_x
            && rect.min().y >= self.min_y
            && rect.max().y <= self.max_y
    }

    /// Clamp a coordinate onto the envelope.
    pub fn clamp(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: c.x.clamp(self.min_x, self.max_x),
            y: c.y.clamp(self.min_y, self.max_y),
        }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

/// Convert a style pixel buffer into ground units.
///
/// # Arguments
///
/// * `style_buffer` - Largest symbol half-width in pixels; `None` uses [`DEFAULT_BUFFER_PIXELS`]
/// * `width_px` / `height_px` - Size of the rendered image
/// * `envelope` - Request envelope (unbuffered)
/// * `oversample` - Renderer oversampling factor; the buffer grows with it
///
/// # Returns
///
/// `buffer_px * envelope.width() / width_px * oversample`
pub fn compute_buffer(
    style_buffer: Option<f64>,
    width_px: u32,
    height_px: u32,
    envelope: &Envelope,
    oversample: f64,
) -> Result<f64> {
    if width_px == 0 || height_px == 0 {
        return Err(Error::InvalidRequest(format!(
            "image size must be non-zero, got {}x{}",
            width_px, height_px
        )));
    }
    if !envelope.is_valid() {
        return Err(Error::InvalidRequest(format!(
            "envelope is not valid: {:?}",
            envelope
        )));
    }
    if !oversample.is_finite() || oversample <= 0.0 {
        return Err(Error::InvalidRequest(format!(
            "oversampling factor must be positive, got {}",
            oversample
        )));
    }

    let buffer_px = style_buffer.unwrap_or(DEFAULT_BUFFER_PIXELS);
    if !buffer_px.is_finite() || buffer_px < 0.0 {
        return Err(Error::InvalidRequest(format!(
            "pixel buffer must be a non-negative number, got {}",
            buffer_px
        )));
    }

    let ground_per_pixel = envelope.width() / width_px as f64;
    Ok(buffer_px * ground_per_pixel * oversample)
}
