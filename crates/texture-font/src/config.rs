//! Font descriptors and engine configuration.

use crate::error::{TextError, TextResult};
use crate::glyph_cache::BakeCounter;

/// Default fixed atlas width in texels.
pub const DEFAULT_ATLAS_WIDTH: u32 = 512;

/// Default atlas height before any growth.
pub const DEFAULT_ATLAS_INITIAL_HEIGHT: u32 = 64;

/// Default hard limit on atlas height.
pub const DEFAULT_ATLAS_MAX_HEIGHT: u32 = 4096;

/// Default gap between packed glyphs to prevent texture bleeding.
pub const DEFAULT_GLYPH_PADDING: u32 = 1;

/// Describes which face to use and how to rasterize it.
///
/// The font bytes themselves are supplied separately; the descriptor only
/// carries the parameters that affect glyph bitmaps and advances.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    /// Family name, used for diagnostics only.
    pub family: String,
    /// Em size in pixels.
    pub pixel_size: f32,
    /// Outline stroke width in pixels. Zero disables outline rendering.
    pub outline_width: f32,
    /// Extra horizontal advance added to every glyph.
    pub advance_x_adjustment: f32,
    /// Face index inside a font collection.
    pub face_index: u32,
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: String::new(),
            pixel_size: 16.0,
            outline_width: 0.0,
            advance_x_adjustment: 0.0,
            face_index: 0,
        }
    }
}

impl FontDescriptor {
    /// Create a descriptor for a family at the given pixel size.
    pub fn new(family: impl Into<String>, pixel_size: f32) -> Self {
        Self {
            family: family.into(),
            pixel_size,
            ..Self::default()
        }
    }

    /// Set the outline stroke width.
    pub fn outline(mut self, width: f32) -> Self {
        self.outline_width = width;
        self
    }

    /// Set the per-glyph advance adjustment.
    pub fn advance_adjustment(mut self, adjustment: f32) -> Self {
        self.advance_x_adjustment = adjustment;
        self
    }

    /// Select a face inside a collection.
    pub fn face_index(mut self, index: u32) -> Self {
        self.face_index = index;
        self
    }

    /// Whether glyphs are rendered with an outline channel.
    pub fn is_outlined(&self) -> bool {
        self.outline_width > 0.0
    }

    /// Reject descriptors no rasterizer can honor.
    pub fn validate(&self) -> TextResult<()> {
        if !(self.pixel_size.is_finite() && self.pixel_size > 0.0) {
            return Err(TextError::FontLoad(format!(
                "invalid pixel size {} for '{}'",
                self.pixel_size, self.family
            )));
        }
        if !(self.outline_width.is_finite() && self.outline_width >= 0.0) {
            return Err(TextError::FontLoad(format!(
                "invalid outline width {} for '{}'",
                self.outline_width, self.family
            )));
        }
        Ok(())
    }
}

/// Dimensions and growth limits of a glyph atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Fixed atlas width in texels.
    pub width: u32,
    /// Height of the buffer when the atlas is created.
    pub initial_height: u32,
    /// The atlas never grows beyond this height.
    pub max_height: u32,
    /// Texels left empty to the right of and below every glyph.
    pub padding: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_ATLAS_WIDTH,
            initial_height: DEFAULT_ATLAS_INITIAL_HEIGHT,
            max_height: DEFAULT_ATLAS_MAX_HEIGHT,
            padding: DEFAULT_GLYPH_PADDING,
        }
    }
}

impl AtlasConfig {
    /// Create a configuration with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fixed width.
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the starting height.
    pub fn initial_height(mut self, height: u32) -> Self {
        self.initial_height = height;
        self
    }

    /// Set the maximum height.
    pub fn max_height(mut self, height: u32) -> Self {
        self.max_height = height;
        self
    }

    /// Set the padding between glyphs.
    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Check that the dimensions describe a usable atlas.
    pub fn validate(&self) -> TextResult<()> {
        if self.width == 0 || self.initial_height == 0 {
            return Err(TextError::InvalidAtlasConfig(format!(
                "atlas dimensions must be non-zero, got {}x{}",
                self.width, self.initial_height
            )));
        }
        if self.initial_height > self.max_height {
            return Err(TextError::InvalidAtlasConfig(format!(
                "initial height {} exceeds max height {}",
                self.initial_height, self.max_height
            )));
        }
        if self.padding >= self.width {
            return Err(TextError::InvalidAtlasConfig(format!(
                "padding {} leaves no room in width {}",
                self.padding, self.width
            )));
        }
        Ok(())
    }
}

/// Options controlling a [`TextureFont`](crate::TextureFont) instance.
#[derive(Debug, Clone)]
pub struct FontOptions {
    /// Atlas dimensions.
    pub atlas: AtlasConfig,
    /// Bake the printable ASCII and Latin-1 ranges on construction.
    pub prebake: bool,
    /// Bake counter, possibly shared with other fonts.
    pub diagnostics: BakeCounter,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            atlas: AtlasConfig::default(),
            prebake: true,
            diagnostics: BakeCounter::new(),
        }
    }
}

impl FontOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the atlas configuration.
    pub fn atlas(mut self, atlas: AtlasConfig) -> Self {
        self.atlas = atlas;
        self
    }

    /// Enable or disable prebaking.
    pub fn prebake(mut self, prebake: bool) -> Self {
        self.prebake = prebake;
        self
    }

    /// Share a bake counter with this font.
    pub fn diagnostics(mut self, counter: BakeCounter) -> Self {
        self.diagnostics = counter;
        self
    }
}
