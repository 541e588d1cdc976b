//! Glyph atlas allocation using shelf packing.
//!
//! Glyphs are placed left to right along the open shelf. When the next bitmap
//! does not fit the remaining width, a new shelf starts below the tallest
//! glyph of the current one. The pixel buffer only ever grows downwards by
//! appending rows, so a placed glyph never moves. Nothing is ever evicted.
//!
//! The texture is allocated once at `width x max_height` and receives the
//! buffer region by region. Normalized UVs are taken against that fixed size,
//! so a UV handed out at placement stays valid for the atlas's whole lifetime.

use tracing::{debug, warn};

use crate::config::AtlasConfig;
use crate::error::{TextError, TextResult};
use crate::raster::{PixelFormat, RasterizedGlyph};
use crate::texture::{AtlasPixels, AtlasTexture};

/// A rectangle of texels inside the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    /// The empty rectangle used for glyphs without pixels.
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the rectangle covers no texels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check whether two rectangles share at least one texel.
    pub fn intersects(&self, other: &AtlasRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Get normalized UV coordinates for an atlas of the given size.
    ///
    /// Returns (u_min, v_min, u_max, v_max).
    pub fn uv_rect(&self, atlas_width: u32, atlas_height: u32) -> (f32, f32, f32, f32) {
        let w = atlas_width as f32;
        let h = atlas_height as f32;
        (
            self.x as f32 / w,
            self.y as f32 / h,
            self.right() as f32 / w,
            self.bottom() as f32 / h,
        )
    }
}

/// Statistics about atlas usage.
#[derive(Debug, Clone, Default)]
pub struct AtlasStats {
    /// Number of bitmaps placed.
    pub placements: u64,
    /// Number of times the buffer grew.
    pub growths: u64,
    /// Number of region uploads issued to the texture.
    pub uploads: u64,
    /// Texels covered by placed bitmaps.
    pub used_texels: u64,
}

/// A growable glyph atlas and the texture mirroring it.
pub struct GlyphAtlas<T: AtlasTexture> {
    /// Row-major pixel buffer.
    pixels: Vec<u8>,
    /// Fixed width in texels.
    width: u32,
    /// Current height in texels.
    height: u32,
    format: PixelFormat,
    config: AtlasConfig,
    /// Next free position on the open shelf.
    cursor_x: u32,
    cursor_y: u32,
    /// Height of the tallest glyph on the open shelf, padding included.
    row_height: u32,
    texture: T,
    stats: AtlasStats,
}

impl<T: AtlasTexture> GlyphAtlas<T> {
    /// Create an atlas and allocate its texture.
    pub fn new(config: AtlasConfig, format: PixelFormat, texture: T) -> TextResult<Self> {
        config.validate()?;

        let len = config.width as usize * config.initial_height as usize * format.bytes_per_pixel();
        let mut atlas = Self {
            pixels: vec![0; len],
            width: config.width,
            height: config.initial_height,
            format,
            config,
            cursor_x: 0,
            cursor_y: 0,
            row_height: 0,
            texture,
            stats: AtlasStats::default(),
        };
        atlas
            .texture
            .allocate(atlas.width, atlas.config.max_height, atlas.format);
        atlas.upload(AtlasRect::new(0, 0, atlas.width, atlas.height));

        debug!(
            width = atlas.width,
            height = atlas.height,
            max_height = config.max_height,
            ?format,
            "glyph atlas created"
        );
        Ok(atlas)
    }

    /// Atlas width in texels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current atlas height in texels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current (width, height).
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Dimensions of the texture, fixed for the atlas's lifetime.
    #[inline]
    pub fn texture_size(&self) -> (u32, u32) {
        (self.width, self.config.max_height)
    }

    /// Normalized (u_min, v_min, u_max, v_max) of a placed rectangle.
    pub fn uv_rect(&self, rect: AtlasRect) -> (f32, f32, f32, f32) {
        let (width, height) = self.texture_size();
        rect.uv_rect(width, height)
    }

    /// Pixel format of the buffer.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The configuration the atlas was created with.
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Borrow the pixel buffer.
    pub fn pixels(&self) -> AtlasPixels<'_> {
        AtlasPixels {
            data: &self.pixels,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    /// The texture mirroring this atlas.
    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// The handle renderers bind to draw text from this atlas.
    pub fn handle(&self) -> T::Handle {
        self.texture.handle()
    }

    /// Get atlas statistics.
    pub fn stats(&self) -> &AtlasStats {
        &self.stats
    }

    /// Fraction of the current buffer covered by glyphs.
    pub fn usage(&self) -> f32 {
        let total = self.width as f64 * self.height as f64;
        (self.stats.used_texels as f64 / total) as f32
    }

    /// Copy a bitmap into the next free slot and upload it.
    ///
    /// Starts a new shelf when the open one is too narrow and grows the buffer
    /// when the shelf would run past the bottom. On failure the packing state
    /// is left untouched, so smaller glyphs may still fit later.
    pub fn place(&mut self, glyph: &RasterizedGlyph) -> TextResult<AtlasRect> {
        if glyph.is_empty() {
            return Ok(AtlasRect::EMPTY);
        }
        if glyph.format != self.format {
            return Err(TextError::InvalidBitmap(format!(
                "{:?} glyph in {:?} atlas",
                glyph.format, self.format
            )));
        }
        let expected = glyph.stride() * glyph.height as usize;
        if glyph.data.len() < expected {
            return Err(TextError::InvalidBitmap(format!(
                "{}x{} glyph needs {} bytes, got {}",
                glyph.width,
                glyph.height,
                expected,
                glyph.data.len()
            )));
        }

        if glyph.width > self.width {
            warn!(
                width = glyph.width,
                height = glyph.height,
                atlas_width = self.width,
                "glyph wider than atlas"
            );
            return Err(TextError::GlyphTooLarge {
                width: glyph.width,
                height: glyph.height,
                atlas_width: self.width,
            });
        }

        let (mut x, mut y, mut row_height) = (self.cursor_x, self.cursor_y, self.row_height);
        if x.saturating_add(glyph.width) > self.width {
            x = 0;
            y = y.saturating_add(row_height);
            row_height = 0;
        }

        let bottom = y.saturating_add(glyph.height);
        if bottom > self.height {
            self.grow(bottom)?;
        }

        let rect = AtlasRect::new(x, y, glyph.width, glyph.height);
        self.blit(glyph, rect);

        let padding = self.config.padding;
        self.cursor_x = x + glyph.width + padding;
        self.cursor_y = y;
        self.row_height = row_height.max(glyph.height + padding);

        self.upload(rect);
        self.stats.placements += 1;
        self.stats.used_texels += u64::from(glyph.width) * u64::from(glyph.height);

        Ok(rect)
    }

    /// Extend the buffer so it is at least `required` rows tall.
    fn grow(&mut self, required: u32) -> TextResult<()> {
        if required > self.config.max_height {
            warn!(
                width = self.width,
                height = self.height,
                required,
                max_height = self.config.max_height,
                "glyph atlas exhausted"
            );
            return Err(TextError::AtlasExhausted {
                width: self.width,
                height: self.height,
                max_height: self.config.max_height,
            });
        }

        let new_height = self
            .height
            .saturating_mul(2)
            .max(required)
            .min(self.config.max_height);

        // Row-major storage: appending rows keeps every existing texel in place.
        let len = self.width as usize * new_height as usize * self.format.bytes_per_pixel();
        self.pixels.resize(len, 0);

        // The texture already spans max_height and starts zeroed.
        debug!(from = self.height, to = new_height, "glyph atlas grown");
        self.height = new_height;
        self.stats.growths += 1;
        Ok(())
    }

    fn blit(&mut self, glyph: &RasterizedGlyph, rect: AtlasRect) {
        let stride = glyph.stride();
        let bpp = self.format.bytes_per_pixel();
        let atlas_stride = self.width as usize * bpp;
        for row in 0..rect.height as usize {
            let src = row * stride;
            let dst = (rect.y as usize + row) * atlas_stride + rect.x as usize * bpp;
            self.pixels[dst..dst + stride].copy_from_slice(&glyph.data[src..src + stride]);
        }
    }

    fn upload(&mut self, region: AtlasRect) {
        let pixels = AtlasPixels {
            data: &self.pixels,
            width: self.width,
            height: self.height,
            format: self.format,
        };
        self.texture.upload_region(pixels, region);
        self.stats.uploads += 1;
    }
}

impl<T: AtlasTexture> std::fmt::Debug for GlyphAtlas<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("cursor", &(self.cursor_x, self.cursor_y))
            .field("usage", &format!("{:.1}%", self.usage() * 100.0))
            .finish()
    }
}
