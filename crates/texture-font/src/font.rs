//! The font instance tying rasterizer, atlas and glyph cache together.

use std::ops::RangeInclusive;

use tracing::{info, trace, warn};

use crate::atlas::{AtlasStats, GlyphAtlas};
use crate::config::{FontDescriptor, FontOptions};
use crate::error::TextResult;
use crate::geometry::{TextGeometry, build_markup, build_text};
use crate::glyph_cache::{BakeCounter, GlyphCache, GlyphCacheStats, GlyphRecord};
use crate::layout::{self, GlyphSource};
use crate::raster::{FontMetrics, FontRasterizer, Rasterizer};
use crate::texture::{AtlasTexture, HeadlessTexture};
use crate::types::{Color, Point, Size};

/// Code points baked on construction when prebaking is enabled.
pub const PREBAKE_RANGES: [RangeInclusive<char>; 2] = ['\u{20}'..='\u{7E}', '\u{A0}'..='\u{FF}'];

/// Draws a batch of glyph quads with the atlas texture bound.
pub trait GlyphRenderer {
    /// The texture handle type this renderer can bind.
    type Texture;

    /// Draw `geometry` sampling from `texture`.
    fn draw_text(&mut self, texture: &Self::Texture, geometry: &TextGeometry);
}

/// A font face at one pixel size, with its glyph atlas and cache.
///
/// Every query bakes missing glyphs on demand. Layout and geometry never
/// fail: code points without a glyph draw the notdef glyph, and code points
/// that no longer fit the atlas still advance the pen but draw nothing.
pub struct TextureFont<R: Rasterizer = FontRasterizer, T: AtlasTexture = HeadlessTexture> {
    rasterizer: R,
    atlas: GlyphAtlas<T>,
    cache: GlyphCache,
    metrics: FontMetrics,
    /// Reused by the render calls.
    scratch: TextGeometry,
}

impl<T: AtlasTexture> TextureFont<FontRasterizer, T> {
    /// Load a font from an in-memory font file.
    pub fn load(
        data: Vec<u8>,
        descriptor: &FontDescriptor,
        texture: T,
        options: FontOptions,
    ) -> TextResult<Self> {
        let rasterizer = FontRasterizer::new(data, descriptor)?;
        let font = Self::with_rasterizer(rasterizer, texture, options)?;
        info!(
            family = %descriptor.family,
            pixel_size = descriptor.pixel_size,
            outlined = descriptor.is_outlined(),
            glyphs = font.cache.len(),
            "font loaded"
        );
        Ok(font)
    }
}

impl<R: Rasterizer, T: AtlasTexture> TextureFont<R, T> {
    /// Create a font around any rasterizer.
    pub fn with_rasterizer(rasterizer: R, texture: T, options: FontOptions) -> TextResult<Self> {
        let atlas = GlyphAtlas::new(options.atlas, rasterizer.pixel_format(), texture)?;
        let metrics = rasterizer.metrics();
        let mut font = Self {
            rasterizer,
            atlas,
            cache: GlyphCache::new(options.diagnostics),
            metrics,
            scratch: TextGeometry::new(),
        };
        if options.prebake {
            font.prebake();
        }
        trace!(
            line_height = metrics.line_height,
            atlas_width = font.atlas.width(),
            "font instance created"
        );
        Ok(font)
    }

    /// Bake the printable ASCII and Latin-1 ranges.
    ///
    /// Stops at the first glyph the atlas has no room for; rejected bitmaps
    /// are skipped. Returns how many code points are cached afterwards.
    pub fn prebake(&mut self) -> usize {
        for ch in PREBAKE_RANGES.into_iter().flatten() {
            match self.glyph(ch) {
                Err(e) if e.is_exhaustion() => {
                    warn!(code_point = u32::from(ch), error = %e, "prebake stopped");
                    break;
                }
                _ => {}
            }
        }
        self.cache.len()
    }

    /// The record for `ch`, baking it if needed.
    ///
    /// Fails with [`TextError::AtlasExhausted`](crate::TextError::AtlasExhausted)
    /// or [`TextError::GlyphTooLarge`](crate::TextError::GlyphTooLarge) when
    /// the glyph cannot be placed, and with
    /// [`TextError::InvalidBitmap`](crate::TextError::InvalidBitmap) when the
    /// rasterizer output does not match the atlas.
    pub fn glyph(&mut self, ch: char) -> TextResult<GlyphRecord> {
        self.cache.get_or_bake(ch, &mut self.rasterizer, &mut self.atlas)
    }

    /// The record for `ch` if it is already baked.
    pub fn cached_glyph(&self, ch: char) -> Option<&GlyphRecord> {
        self.cache.get(ch)
    }

    /// Baseline-to-baseline distance.
    pub fn height(&self) -> f32 {
        self.metrics.line_height
    }

    /// Distance from the baseline down to the lowest descender.
    pub fn descender(&self) -> f32 {
        self.metrics.descender
    }

    /// Distance from a line's top edge to its baseline.
    pub fn ascent(&self) -> f32 {
        self.metrics.ascent
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Bounding box of `text`, at least one line tall.
    pub fn measure_string(&mut self, text: impl AsRef<[u8]>) -> Size {
        layout::measure(&mut self.source(), text.as_ref())
    }

    /// Pen position before the `index`-th code point of `text`.
    pub fn measure_character_pos(&mut self, text: impl AsRef<[u8]>, index: usize) -> Point {
        layout::character_position(&mut self.source(), text.as_ref(), index)
    }

    /// Code point index under (`x`, `y`), relative to the text origin.
    pub fn pick_character(&mut self, text: impl AsRef<[u8]>, x: f32, y: f32) -> usize {
        layout::pick_character(&mut self.source(), text.as_ref(), x, y)
    }

    /// Append quads for `text` with its top-left corner at (`x`, `y`).
    pub fn create_geometry(
        &mut self,
        geometry: &mut TextGeometry,
        text: impl AsRef<[u8]>,
        x: f32,
        y: f32,
        color: Color,
    ) {
        build_text(
            &mut self.source(),
            text.as_ref(),
            Point::new(x, y),
            color,
            geometry,
        );
    }

    /// Append quads for markup text and return the color in effect at its end.
    pub fn create_markup_geometry(
        &mut self,
        geometry: &mut TextGeometry,
        text: impl AsRef<[u8]>,
        x: f32,
        y: f32,
        color: Color,
    ) -> Color {
        build_markup(
            &mut self.source(),
            text.as_ref(),
            Point::new(x, y),
            color,
            geometry,
        )
    }

    /// Lay out `text` and hand it to `renderer` with the atlas texture bound.
    pub fn render_string<G>(&mut self, renderer: &mut G, text: impl AsRef<[u8]>, x: f32, y: f32, color: Color)
    where
        G: GlyphRenderer<Texture = T::Handle> + ?Sized,
    {
        let mut geometry = std::mem::take(&mut self.scratch);
        geometry.clear();
        self.create_geometry(&mut geometry, text, x, y, color);
        self.submit(renderer, &geometry);
        self.scratch = geometry;
    }

    /// Like [`render_string`](Self::render_string) but honoring color
    /// markers. Returns the color in effect at the end of `text`.
    pub fn render_markup<G>(
        &mut self,
        renderer: &mut G,
        text: impl AsRef<[u8]>,
        x: f32,
        y: f32,
        color: Color,
    ) -> Color
    where
        G: GlyphRenderer<Texture = T::Handle> + ?Sized,
    {
        let mut geometry = std::mem::take(&mut self.scratch);
        geometry.clear();
        let color = self.create_markup_geometry(&mut geometry, text, x, y, color);
        self.submit(renderer, &geometry);
        self.scratch = geometry;
        color
    }

    fn submit<G>(&self, renderer: &mut G, geometry: &TextGeometry)
    where
        G: GlyphRenderer<Texture = T::Handle> + ?Sized,
    {
        if geometry.is_empty() {
            return;
        }
        // Taken after layout so growth during baking is already uploaded.
        let texture = self.atlas.handle();
        renderer.draw_text(&texture, geometry);
    }

    /// The texture handle to bind when drawing this font's geometry.
    pub fn texture(&self) -> T::Handle {
        self.atlas.handle()
    }

    pub fn atlas(&self) -> &GlyphAtlas<T> {
        &self.atlas
    }

    pub fn atlas_stats(&self) -> &AtlasStats {
        self.atlas.stats()
    }

    pub fn cache_stats(&self) -> &GlyphCacheStats {
        self.cache.stats()
    }

    /// The bake counter, possibly shared with other fonts.
    pub fn diagnostics(&self) -> &BakeCounter {
        self.cache.diagnostics()
    }

    /// Glyphs baked since the counter was last cleared.
    pub fn glyph_count(&self) -> usize {
        self.cache.diagnostics().count()
    }

    /// Reset the bake counter; shared counters reset for every font.
    pub fn clear_glyph_count(&self) {
        self.cache.diagnostics().clear();
    }

    fn source(&mut self) -> Baker<'_, R, T> {
        Baker {
            rasterizer: &mut self.rasterizer,
            atlas: &mut self.atlas,
            cache: &mut self.cache,
            metrics: self.metrics,
        }
    }
}

impl<R: Rasterizer, T: AtlasTexture> std::fmt::Debug for TextureFont<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureFont")
            .field("metrics", &self.metrics)
            .field("atlas", &self.atlas)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Glyph source that bakes on demand and absorbs placement failures.
struct Baker<'a, R: Rasterizer, T: AtlasTexture> {
    rasterizer: &'a mut R,
    atlas: &'a mut GlyphAtlas<T>,
    cache: &'a mut GlyphCache,
    metrics: FontMetrics,
}

impl<R: Rasterizer, T: AtlasTexture> GlyphSource for Baker<'_, R, T> {
    fn glyph(&mut self, ch: char) -> GlyphRecord {
        match self.cache.get_or_bake(ch, &mut *self.rasterizer, &mut *self.atlas) {
            Ok(record) => record,
            Err(e) => {
                trace!(code_point = u32::from(ch), error = %e, "drawing blank glyph");
                self.cache.unplaced(ch).unwrap_or_default()
            }
        }
    }

    fn line_height(&self) -> f32 {
        self.metrics.line_height
    }

    fn ascent(&self) -> f32 {
        self.metrics.ascent
    }
}

static_assertions::assert_impl_all!(GlyphRecord: Send, Sync, Copy);
static_assertions::assert_impl_all!(TextureFont: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AtlasConfig;
    use crate::raster::{PixelFormat, RasterizedGlyph, stroke_outline};
    use crate::texture::HeadlessHandle;

    /// Every code point maps to a 6x10 glyph with advance 7.
    struct BlockRasterizer;

    impl Rasterizer for BlockRasterizer {
        fn metrics(&self) -> FontMetrics {
            FontMetrics {
                ascent: 10.0,
                descender: 3.0,
                line_height: 14.0,
            }
        }

        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::Alpha
        }

        fn glyph_index(&self, ch: char) -> Option<u32> {
            Some(ch as u32)
        }

        fn rasterize_index(&mut self, index: u32) -> RasterizedGlyph {
            let (width, height) = if index == ' ' as u32 { (0, 0) } else { (6, 10) };
            RasterizedGlyph {
                index,
                data: vec![200; (width * height) as usize],
                width,
                height,
                bearing_x: 0,
                bearing_y: 10,
                advance_x: 7.0,
                advance_y: 0.0,
                format: PixelFormat::Alpha,
            }
        }
    }

    /// Outlined 4x6 boxes: two channels, one texel of stroke on every side.
    struct OutlineRasterizer;

    impl Rasterizer for OutlineRasterizer {
        fn metrics(&self) -> FontMetrics {
            BlockRasterizer.metrics()
        }

        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::LuminanceAlpha
        }

        fn glyph_index(&self, ch: char) -> Option<u32> {
            Some(ch as u32)
        }

        fn rasterize_index(&mut self, index: u32) -> RasterizedGlyph {
            let (data, width, height, radius) = stroke_outline(&[255; 4 * 6], 4, 6, 1.0);
            RasterizedGlyph {
                index,
                data,
                width,
                height,
                bearing_x: -(radius as i32),
                bearing_y: 6 + radius as i32,
                advance_x: 5.0,
                advance_y: 0.0,
                format: PixelFormat::LuminanceAlpha,
            }
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        draws: Vec<(HeadlessHandle, usize)>,
    }

    impl GlyphRenderer for RecordingRenderer {
        type Texture = HeadlessHandle;

        fn draw_text(&mut self, texture: &HeadlessHandle, geometry: &TextGeometry) {
            self.draws.push((*texture, geometry.quad_count()));
        }
    }

    fn font(options: FontOptions) -> TextureFont<BlockRasterizer> {
        TextureFont::with_rasterizer(BlockRasterizer, HeadlessTexture::new(), options).unwrap()
    }

    #[test]
    fn prebake_covers_ascii_and_latin1() {
        let font = font(FontOptions::new());
        assert_eq!(font.glyph_count(), 95 + 96);
        assert!(font.cached_glyph('~').is_some());
        assert!(font.cached_glyph('ÿ').is_some());
        assert!(font.cached_glyph('\u{7F}').is_none());
    }

    #[test]
    fn prebake_can_be_disabled() {
        let font = font(FontOptions::new().prebake(false));
        assert_eq!(font.glyph_count(), 0);
        assert_eq!(font.height(), 14.0);
        assert_eq!(font.descender(), 3.0);
    }

    #[test]
    fn prebake_stops_when_atlas_is_full() {
        let atlas = AtlasConfig::new()
            .width(14)
            .initial_height(10)
            .max_height(10)
            .padding(1);
        let font = font(FontOptions::new().atlas(atlas));
        // The space bakes blank, then '!' and '"' fill the only shelf.
        assert_eq!(font.glyph_count(), 3);
        assert_eq!(font.cache_stats().exhausted, 1);
    }

    #[test]
    fn render_string_draws_with_current_texture() {
        let mut font = font(FontOptions::new().prebake(false));
        let mut renderer = RecordingRenderer::default();
        font.render_string(&mut renderer, "a b", 0.0, 0.0, Color::WHITE);
        font.render_string(&mut renderer, "", 0.0, 0.0, Color::WHITE);

        assert_eq!(renderer.draws.len(), 1);
        assert_eq!(renderer.draws[0], (font.texture(), 2));
    }

    #[test]
    fn render_markup_returns_final_color() {
        let mut font = font(FontOptions::new().prebake(false));
        let mut renderer = RecordingRenderer::default();
        let color = font.render_markup(&mut renderer, "#0f0go", 0.0, 0.0, Color::WHITE);
        assert_eq!(color, Color::GREEN);
        assert_eq!(renderer.draws[0].1, 2);
    }

    #[test]
    fn outlined_glyphs_use_a_two_channel_atlas() {
        let atlas = AtlasConfig::new().width(32).initial_height(8).max_height(64);
        let mut font = TextureFont::with_rasterizer(
            OutlineRasterizer,
            HeadlessTexture::new(),
            FontOptions::new().atlas(atlas).prebake(false),
        )
        .unwrap();
        assert_eq!(font.atlas().format(), PixelFormat::LuminanceAlpha);

        let mut geometry = TextGeometry::new();
        font.create_geometry(&mut geometry, "abcdefgh", 0.0, 0.0, Color::WHITE);
        assert_eq!(geometry.quad_count(), 8);

        let record = *font.cached_glyph('a').unwrap();
        assert_eq!((record.width, record.height), (6.0, 8.0));
        assert_eq!(record.offset_x, -1);

        let atlas = font.atlas();
        let pixels = atlas.pixels();
        assert_eq!(pixels.stride(), 32 * 2);
        // Interior texel: fill and outline both covered; corner: neither.
        let inner = pixels.offset(record.atlas.x + 1, record.atlas.y + 1);
        assert_eq!(&pixels.data[inner..inner + 2], &[255, 255]);
        let corner = pixels.offset(record.atlas.x, record.atlas.y);
        assert_eq!(&pixels.data[corner..corner + 2], &[0, 0]);
        assert_eq!(&atlas.texture().pixels()[..pixels.data.len()], pixels.data);
        assert_eq!(atlas.texture().pixels().len(), 32 * 64 * 2);
    }

    #[test]
    fn clear_glyph_count_resets_diagnostics_only() {
        let mut font = font(FontOptions::new().prebake(false));
        font.measure_string("abc");
        assert_eq!(font.glyph_count(), 3);
        font.clear_glyph_count();
        assert_eq!(font.glyph_count(), 0);
        font.measure_string("abc");
        assert_eq!(font.glyph_count(), 0);
        assert!(font.cached_glyph('b').is_some());
    }
}
