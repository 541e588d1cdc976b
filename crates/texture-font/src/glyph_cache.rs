//! Code point to glyph record caching.
//!
//! Records live in one of two tiers: a directly indexed array for the first
//! [`FAST_GLYPH_COUNT`] code points and an ordered map for everything above.
//! A record is baked at most once per cache and never changes or leaves the
//! cache afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace, warn};

use crate::atlas::{AtlasRect, GlyphAtlas};
use crate::error::{TextError, TextResult};
use crate::raster::{NOTDEF_INDEX, RasterizedGlyph, Rasterizer};
use crate::texture::AtlasTexture;

/// Code points below this value are served from the array tier.
pub const FAST_GLYPH_COUNT: usize = 256;

/// Metrics and atlas location of one baked glyph.
///
/// Records hold texel coordinates and UVs normalized against the fixed
/// texture size, never a reference into the atlas buffer, so atlas growth
/// cannot invalidate them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphRecord {
    /// Horizontal pen advance.
    pub advance_x: f32,
    /// Vertical pen advance.
    pub advance_y: f32,
    /// Bitmap width in pixels.
    pub width: f32,
    /// Bitmap height in pixels.
    pub height: f32,
    /// Pen to bitmap left edge.
    pub offset_x: i32,
    /// Baseline up to bitmap top edge.
    pub offset_y: i32,
    /// Texel rectangle inside the atlas.
    pub atlas: AtlasRect,
    /// Normalized top-left texture coordinate.
    pub uv_min: [f32; 2],
    /// Normalized bottom-right texture coordinate.
    pub uv_max: [f32; 2],
    /// Native glyph index, usable to re-rasterize the glyph.
    pub raster_index: u32,
}

impl GlyphRecord {
    fn from_raster(glyph: &RasterizedGlyph, atlas: AtlasRect, uv: (f32, f32, f32, f32)) -> Self {
        let (u_min, v_min, u_max, v_max) = uv;
        Self {
            advance_x: glyph.advance_x,
            advance_y: glyph.advance_y,
            width: glyph.width as f32,
            height: glyph.height as f32,
            offset_x: glyph.bearing_x,
            offset_y: glyph.bearing_y,
            atlas,
            uv_min: [u_min, v_min],
            uv_max: [u_max, v_max],
            raster_index: glyph.index,
        }
    }

    /// A record that only advances the pen.
    fn blank(glyph: &RasterizedGlyph) -> Self {
        Self {
            advance_x: glyph.advance_x,
            advance_y: glyph.advance_y,
            raster_index: glyph.index,
            ..Self::default()
        }
    }

    /// Whether drawing this glyph produces no pixels.
    pub fn is_blank(&self) -> bool {
        self.atlas.is_empty()
    }
}

/// Counts glyph bakes for diagnostics.
///
/// Clones share the same counter, so one counter can observe several fonts.
/// The count only resets through [`clear`](Self::clear).
#[derive(Debug, Clone, Default)]
pub struct BakeCounter {
    baked: Arc<AtomicUsize>,
}

impl BakeCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of glyphs baked since the last clear.
    pub fn count(&self) -> usize {
        self.baked.load(Ordering::Relaxed)
    }

    /// Reset the count to zero.
    pub fn clear(&self) {
        self.baked.store(0, Ordering::Relaxed);
    }

    fn record(&self) {
        self.baked.fetch_add(1, Ordering::Relaxed);
    }
}

/// Statistics about glyph cache usage.
#[derive(Debug, Clone, Default)]
pub struct GlyphCacheStats {
    /// Lookups answered from either tier.
    pub hits: u64,
    /// Lookups that had to rasterize.
    pub misses: u64,
    /// Code points drawn with the notdef glyph.
    pub notdef_substitutions: u64,
    /// Code points that did not fit the atlas.
    pub exhausted: u64,
    /// Code points whose bitmap the atlas rejected.
    pub rejected: u64,
}

/// Two-tier glyph record cache for one font instance.
pub struct GlyphCache {
    /// Directly indexed by code point.
    fast: Vec<Option<GlyphRecord>>,
    /// Code points at or above [`FAST_GLYPH_COUNT`].
    overflow: BTreeMap<char, GlyphRecord>,
    /// Advance-only records for code points the atlas refused, with the reason.
    unplaced: BTreeMap<char, (GlyphRecord, TextError)>,
    /// Atlas placements by raster index, shared between code points.
    placements: BTreeMap<u32, AtlasRect>,
    diagnostics: BakeCounter,
    stats: GlyphCacheStats,
}

impl GlyphCache {
    /// Create an empty cache reporting bakes to `diagnostics`.
    pub fn new(diagnostics: BakeCounter) -> Self {
        Self {
            fast: vec![None; FAST_GLYPH_COUNT],
            overflow: BTreeMap::new(),
            unplaced: BTreeMap::new(),
            placements: BTreeMap::new(),
            diagnostics,
            stats: GlyphCacheStats::default(),
        }
    }

    /// The bake counter this cache reports to.
    pub fn diagnostics(&self) -> &BakeCounter {
        &self.diagnostics
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &GlyphCacheStats {
        &self.stats
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.fast.iter().flatten().count() + self.overflow.len()
    }

    /// Check whether nothing has been baked yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a baked record without rasterizing.
    pub fn get(&self, ch: char) -> Option<&GlyphRecord> {
        let cp = ch as usize;
        if cp < FAST_GLYPH_COUNT {
            self.fast[cp].as_ref()
        } else {
            self.overflow.get(&ch)
        }
    }

    /// The advance-only stand-in for a code point the atlas refused.
    pub fn unplaced(&self, ch: char) -> Option<GlyphRecord> {
        self.unplaced.get(&ch).map(|(record, _)| *record)
    }

    /// Why a code point could not be placed.
    pub fn unplaced_error(&self, ch: char) -> Option<&TextError> {
        self.unplaced.get(&ch).map(|(_, error)| error)
    }

    /// Return the record for `ch`, baking it on a miss.
    ///
    /// Unmapped code points are baked with the notdef glyph. Fails only when
    /// the atlas refuses the bitmap; the code point is then remembered as
    /// unplaced and every later call returns the same error without
    /// rasterizing again.
    pub fn get_or_bake<R, T>(
        &mut self,
        ch: char,
        rasterizer: &mut R,
        atlas: &mut GlyphAtlas<T>,
    ) -> TextResult<GlyphRecord>
    where
        R: Rasterizer,
        T: AtlasTexture,
    {
        if let Some(record) = self.get(ch).copied() {
            self.stats.hits += 1;
            return Ok(record);
        }
        if let Some((_, error)) = self.unplaced.get(&ch) {
            return Err(error.clone());
        }
        self.stats.misses += 1;

        let glyph = match rasterizer.rasterize(ch) {
            Ok(glyph) => glyph,
            Err(TextError::GlyphNotFound(_)) => {
                warn!(code_point = u32::from(ch), "no glyph in font, using notdef");
                self.stats.notdef_substitutions += 1;
                rasterizer.rasterize_index(NOTDEF_INDEX)
            }
            Err(e) => return Err(e),
        };

        let rect = match self.placement_for(&glyph, atlas) {
            Ok(rect) => rect,
            Err(e) => {
                if e.is_exhaustion() {
                    self.stats.exhausted += 1;
                } else {
                    warn!(code_point = u32::from(ch), error = %e, "glyph rejected by atlas");
                    self.stats.rejected += 1;
                }
                self.unplaced.insert(ch, (GlyphRecord::blank(&glyph), e.clone()));
                return Err(e);
            }
        };

        let record = GlyphRecord::from_raster(&glyph, rect, atlas.uv_rect(rect));
        self.insert(ch, record);
        self.diagnostics.record();

        debug!(
            code_point = u32::from(ch),
            raster_index = glyph.index,
            width = glyph.width,
            height = glyph.height,
            atlas_x = rect.x,
            atlas_y = rect.y,
            "glyph baked"
        );
        Ok(record)
    }

    /// Reuse the placement of an already packed raster index, or pack the bitmap.
    fn placement_for<T: AtlasTexture>(
        &mut self,
        glyph: &RasterizedGlyph,
        atlas: &mut GlyphAtlas<T>,
    ) -> TextResult<AtlasRect> {
        if glyph.is_empty() {
            return Ok(AtlasRect::EMPTY);
        }
        if let Some(rect) = self.placements.get(&glyph.index) {
            trace!(raster_index = glyph.index, "sharing atlas placement");
            return Ok(*rect);
        }
        let rect = atlas.place(glyph)?;
        self.placements.insert(glyph.index, rect);
        Ok(rect)
    }

    fn insert(&mut self, ch: char, record: GlyphRecord) {
        let cp = ch as usize;
        if cp < FAST_GLYPH_COUNT {
            debug_assert!(self.fast[cp].is_none());
            self.fast[cp] = Some(record);
        } else {
            let previous = self.overflow.insert(ch, record);
            debug_assert!(previous.is_none());
        }
    }
}

impl std::fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphCache")
            .field("len", &self.len())
            .field("unplaced", &self.unplaced.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
