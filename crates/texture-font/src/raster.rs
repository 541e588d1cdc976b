//! Glyph rasterization.
//!
//! The [`Rasterizer`] trait is the narrow contract the glyph cache consumes:
//! hand it a code point, get back an 8-bit coverage bitmap plus the metrics
//! needed for layout. [`FontRasterizer`] implements it on top of `ab_glyph`.
//!
//! Rasterizers are not required to be thread safe. Every font instance owns
//! its own rasterizer and drives it from one thread.

use ab_glyph::{Font as _, FontVec, GlyphId, PxScale, ScaleFont as _, point};
use tracing::debug;

use crate::config::FontDescriptor;
use crate::error::{TextError, TextResult};

/// Raster index of the font's notdef glyph.
pub const NOTDEF_INDEX: u32 = 0;

/// Pixel layout of rasterized glyphs and of the atlas that stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// One coverage byte per pixel.
    #[default]
    Alpha,
    /// Two bytes per pixel: fill coverage, then outline coverage.
    LuminanceAlpha,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Alpha => 1,
            PixelFormat::LuminanceAlpha => 2,
        }
    }
}

/// Vertical metrics shared by every glyph of a face at one size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    /// Distance from a line's top edge down to its baseline.
    pub ascent: f32,
    /// Distance from the baseline down to the lowest descender (positive).
    pub descender: f32,
    /// Baseline-to-baseline distance.
    pub line_height: f32,
}

/// A rasterized glyph ready to be packed into the atlas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RasterizedGlyph {
    /// Native glyph index inside the font.
    pub index: u32,
    /// Row-major pixel data, `width * height * format.bytes_per_pixel()` bytes.
    pub data: Vec<u8>,
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Horizontal offset from the pen position to the bitmap's left edge.
    pub bearing_x: i32,
    /// Vertical offset from the baseline up to the bitmap's top edge.
    pub bearing_y: i32,
    /// Horizontal pen advance.
    pub advance_x: f32,
    /// Vertical pen advance.
    pub advance_y: f32,
    /// Pixel format of `data`.
    pub format: PixelFormat,
}

impl RasterizedGlyph {
    /// Check if this glyph has no visible pixels (e.g. a space).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes in one bitmap row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }
}

/// Produces glyph bitmaps and metrics for one font face at one size.
pub trait Rasterizer {
    /// Vertical metrics of the face.
    fn metrics(&self) -> FontMetrics;

    /// Format of every bitmap this rasterizer produces.
    fn pixel_format(&self) -> PixelFormat;

    /// Map a code point to a native glyph index, `None` when unmapped.
    fn glyph_index(&self, ch: char) -> Option<u32>;

    /// Rasterize a glyph by native index.
    ///
    /// Out-of-range indices must fall back to [`NOTDEF_INDEX`].
    fn rasterize_index(&mut self, index: u32) -> RasterizedGlyph;

    /// Rasterize the glyph for a code point.
    fn rasterize(&mut self, ch: char) -> TextResult<RasterizedGlyph> {
        let index = self.glyph_index(ch).ok_or(TextError::GlyphNotFound(ch))?;
        Ok(self.rasterize_index(index))
    }
}

/// `ab_glyph` backed rasterizer over an owned font blob.
pub struct FontRasterizer {
    font: FontVec,
    scale: PxScale,
    outline_width: f32,
    advance_x_adjustment: f32,
    metrics: FontMetrics,
}

impl FontRasterizer {
    /// Parse a font blob and prepare it for rasterization at the descriptor's size.
    pub fn new(data: Vec<u8>, descriptor: &FontDescriptor) -> TextResult<Self> {
        descriptor.validate()?;

        let font = FontVec::try_from_vec_and_index(data, descriptor.face_index).map_err(|e| {
            TextError::FontLoad(format!("failed to parse '{}': {}", descriptor.family, e))
        })?;

        let units_per_em = font.units_per_em().ok_or_else(|| {
            TextError::FontLoad(format!("'{}' has no units per em", descriptor.family))
        })?;

        // ab_glyph scales by ascent - descent; convert so the em box is `pixel_size` tall.
        let scale = PxScale::from(descriptor.pixel_size * font.height_unscaled() / units_per_em);
        let scaled = font.as_scaled(scale);
        let metrics = FontMetrics {
            ascent: scaled.ascent(),
            descender: -scaled.descent(),
            line_height: scaled.height() + scaled.line_gap(),
        };

        debug!(
            family = %descriptor.family,
            pixel_size = descriptor.pixel_size,
            glyphs = font.glyph_count(),
            line_height = metrics.line_height,
            "font face parsed"
        );

        Ok(Self {
            font,
            scale,
            outline_width: descriptor.outline_width,
            advance_x_adjustment: descriptor.advance_x_adjustment,
            metrics,
        })
    }

    /// Render the fill coverage of a glyph.
    fn fill_bitmap(&self, id: GlyphId) -> (Vec<u8>, u32, u32, i32, i32) {
        let glyph = id.with_scale_and_position(self.scale, point(0.0, 0.0));
        let Some(outlined) = self.font.outline_glyph(glyph) else {
            return (Vec::new(), 0, 0, 0, 0);
        };

        let bounds = outlined.px_bounds();
        let width = bounds.width().max(0.0) as u32;
        let height = bounds.height().max(0.0) as u32;
        let mut data = vec![0u8; width as usize * height as usize];

        outlined.draw(|x, y, coverage| {
            if x < width && y < height {
                let idx = (y * width + x) as usize;
                data[idx] = (coverage * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        });

        (data, width, height, bounds.min.x as i32, -bounds.min.y as i32)
    }
}

impl Rasterizer for FontRasterizer {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn pixel_format(&self) -> PixelFormat {
        if self.outline_width > 0.0 {
            PixelFormat::LuminanceAlpha
        } else {
            PixelFormat::Alpha
        }
    }

    fn glyph_index(&self, ch: char) -> Option<u32> {
        let id = self.font.glyph_id(ch);
        (u32::from(id.0) != NOTDEF_INDEX).then_some(u32::from(id.0))
    }

    fn rasterize_index(&mut self, index: u32) -> RasterizedGlyph {
        let index = match u16::try_from(index) {
            Ok(i) if usize::from(i) < self.font.glyph_count() => i,
            _ => NOTDEF_INDEX as u16,
        };
        let id = GlyphId(index);
        let advance_x = self.font.as_scaled(self.scale).h_advance(id) + self.advance_x_adjustment;

        let (fill, width, height, bearing_x, bearing_y) = self.fill_bitmap(id);

        if self.outline_width > 0.0 {
            let (data, width, height, radius) = stroke_outline(&fill, width, height, self.outline_width);
            return RasterizedGlyph {
                index: u32::from(index),
                data,
                width,
                height,
                bearing_x: bearing_x - radius as i32,
                bearing_y: bearing_y + radius as i32,
                advance_x,
                advance_y: 0.0,
                format: PixelFormat::LuminanceAlpha,
            };
        }

        RasterizedGlyph {
            index: u32::from(index),
            data: fill,
            width,
            height,
            bearing_x,
            bearing_y,
            advance_x,
            advance_y: 0.0,
            format: PixelFormat::Alpha,
        }
    }
}

impl std::fmt::Debug for FontRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRasterizer")
            .field("scale", &self.scale)
            .field("outline_width", &self.outline_width)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Build a two-channel bitmap from fill coverage: channel 0 holds the fill,
/// channel 1 the fill dilated by `outline_width`.
///
/// The result is padded by the stroke radius on every side. Returns the data,
/// the new dimensions and the radius.
pub(crate) fn stroke_outline(
    fill: &[u8],
    width: u32,
    height: u32,
    outline_width: f32,
) -> (Vec<u8>, u32, u32, u32) {
    if width == 0 || height == 0 {
        return (Vec::new(), 0, 0, 0);
    }

    let radius = outline_width.ceil() as u32;
    let out_w = width + radius * 2;
    let out_h = height + radius * 2;
    let mut data = vec![0u8; out_w as usize * out_h as usize * 2];

    let r = radius as i64;
    let limit = outline_width * outline_width;
    let kernel: Vec<(i64, i64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| ((dx * dx + dy * dy) as f32) <= limit)
        .collect();

    let sample = |x: i64, y: i64| -> u8 {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            0
        } else {
            fill[(y * width as i64 + x) as usize]
        }
    };

    for oy in 0..out_h as i64 {
        for ox in 0..out_w as i64 {
            let sx = ox - r;
            let sy = oy - r;
            let idx = ((oy * out_w as i64 + ox) * 2) as usize;
            data[idx] = sample(sx, sy);
            data[idx + 1] = kernel
                .iter()
                .map(|&(dx, dy)| sample(sx + dx, sy + dy))
                .max()
                .unwrap_or(0);
        }
    }

    (data, out_w, out_h, radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_bytes() {
        assert_eq!(PixelFormat::Alpha.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::LuminanceAlpha.bytes_per_pixel(), 2);
    }

    #[test]
    fn rejects_garbage_font_data() {
        let descriptor = FontDescriptor::new("Broken", 16.0);
        let err = FontRasterizer::new(vec![0, 1, 2, 3, 4, 5], &descriptor).unwrap_err();
        assert!(matches!(err, TextError::FontLoad(_)));
    }

    #[test]
    fn rejects_invalid_descriptor_before_parsing() {
        let descriptor = FontDescriptor::new("Broken", -3.0);
        let err = FontRasterizer::new(Vec::new(), &descriptor).unwrap_err();
        assert!(err.to_string().contains("pixel size"));
    }

    #[test]
    fn stroke_outline_dilates_single_pixel() {
        let (data, w, h, radius) = stroke_outline(&[255], 1, 1, 1.0);
        assert_eq!((w, h, radius), (3, 3, 1));
        assert_eq!(data.len(), 3 * 3 * 2);

        let fill: Vec<u8> = data.iter().step_by(2).copied().collect();
        let outline: Vec<u8> = data.iter().skip(1).step_by(2).copied().collect();
        assert_eq!(fill, vec![0, 0, 0, 0, 255, 0, 0, 0, 0]);
        // Radius 1 covers the 4-neighbourhood but not the corners.
        assert_eq!(outline, vec![0, 255, 0, 255, 255, 255, 0, 255, 0]);
    }

    #[test]
    fn stroke_outline_of_empty_bitmap_is_empty() {
        let (data, w, h, _) = stroke_outline(&[], 0, 0, 2.0);
        assert!(data.is_empty());
        assert_eq!((w, h), (0, 0));
    }

    #[test]
    fn empty_glyph_detection() {
        let glyph = RasterizedGlyph {
            width: 0,
            height: 12,
            advance_x: 4.0,
            ..Default::default()
        };
        assert!(glyph.is_empty());
        assert_eq!(glyph.stride(), 0);
    }
}
