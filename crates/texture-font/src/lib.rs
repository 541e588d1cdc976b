//! Glyph atlas caching and text layout for GPU text rendering.
//!
//! A [`TextureFont`] rasterizes glyphs on demand, packs them into a single
//! atlas texture and turns strings into textured quads. It also
//! answers the layout queries a text field needs: string extents, caret
//! positions and mouse hit tests.
//!
//! # Getting Started
//!
//! ```no_run
//! use texture_font::{Color, FontDescriptor, FontOptions, HeadlessTexture, TextGeometry, TextureFont};
//!
//! # fn example(font_data: Vec<u8>) -> texture_font::TextResult<()> {
//! let descriptor = FontDescriptor::new("DejaVu Sans", 16.0);
//! let mut font = TextureFont::load(font_data, &descriptor, HeadlessTexture::new(), FontOptions::default())?;
//!
//! let size = font.measure_string("Hello, world");
//! println!("{} x {}", size.width, size.height);
//!
//! let mut geometry = TextGeometry::new();
//! font.create_geometry(&mut geometry, "Hello, world", 10.0, 10.0, Color::WHITE);
//! println!("{} quads", geometry.quad_count());
//! # Ok(())
//! # }
//! ```
//!
//! # Coordinates
//!
//! Text coordinates are y-down with the first line's top edge at the origin.
//! Line `i` spans `[i * height, (i + 1) * height)` and its baseline sits
//! [`TextureFont::ascent`] below the line top. Character indices count
//! decoded code points, newlines included.
//!
//! # Markup
//!
//! [`TextureFont::render_markup`] and [`TextureFont::create_markup_geometry`]
//! recognize `#rgb` color markers:
//!
//! ```no_run
//! # use texture_font::{Color, TextGeometry, TextureFont};
//! # fn example(font: &mut TextureFont, geometry: &mut TextGeometry) {
//! let color = font.create_markup_geometry(geometry, "#f00red #0f0green", 0.0, 0.0, Color::WHITE);
//! // Continue the next string in the same color.
//! font.create_markup_geometry(geometry, " still green", 0.0, 20.0, color);
//! # }
//! ```
//!
//! # GPU Upload
//!
//! The atlas mirrors its pixels into an [`AtlasTexture`]. [`HeadlessTexture`]
//! keeps a CPU copy; with the `wgpu` feature, `WgpuAtlasTexture` writes into a
//! `wgpu::Texture`. The texture is allocated once at the atlas's maximum
//! height; growth only extends the CPU buffer, so glyph UVs never change.

mod atlas;
mod config;
mod decode;
mod error;
mod font;
mod geometry;
mod glyph_cache;
#[cfg(feature = "wgpu")]
mod gpu;
mod layout;
mod markup;
mod raster;
mod texture;
mod types;

// Font instance
pub use config::{
    AtlasConfig, DEFAULT_ATLAS_INITIAL_HEIGHT, DEFAULT_ATLAS_MAX_HEIGHT, DEFAULT_ATLAS_WIDTH,
    DEFAULT_GLYPH_PADDING, FontDescriptor, FontOptions,
};
pub use error::{TextError, TextResult};
pub use font::{GlyphRenderer, PREBAKE_RANGES, TextureFont};

// Glyph storage
pub use atlas::{AtlasRect, AtlasStats, GlyphAtlas};
pub use glyph_cache::{BakeCounter, FAST_GLYPH_COUNT, GlyphCache, GlyphCacheStats, GlyphRecord};
pub use raster::{
    FontMetrics, FontRasterizer, NOTDEF_INDEX, PixelFormat, RasterizedGlyph, Rasterizer,
};

// Layout and geometry
pub use decode::{CodePoints, REPLACEMENT_CHARACTER, code_points};
pub use geometry::{TextGeometry, TextVertex, build, build_markup, build_text};
pub use layout::{GlyphSource, LayoutCursor, NEWLINE, character_position, measure, pick_character};
pub use markup::{MARKER_START, MarkupScanner, MarkupToken, scan};
pub use types::{Color, Point, Rect, Size};

// Texture upload
#[cfg(feature = "wgpu")]
pub use gpu::{WgpuAtlasTexture, texture_format};
pub use texture::{AtlasPixels, AtlasTexture, HeadlessHandle, HeadlessTexture};

#[cfg(feature = "wgpu")]
pub use wgpu;
