//! Error types for the texture font crate.

use thiserror::Error;

/// Errors that can occur while loading fonts, baking glyphs or decoding text.
///
/// Only [`FontLoad`](TextError::FontLoad), [`InvalidAtlasConfig`](TextError::InvalidAtlasConfig)
/// and the atlas capacity variants ever reach callers. Glyph lookups that miss the
/// font and malformed input bytes are recovered inside the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    /// The font blob or its descriptor could not be turned into a usable face.
    #[error("failed to load font: {0}")]
    FontLoad(String),

    /// The font has no mapping for the requested code point.
    #[error("no glyph for code point U+{:04X}", scalar(.0))]
    GlyphNotFound(char),

    /// The atlas cannot grow far enough to hold another glyph.
    #[error("glyph atlas exhausted at {width}x{height} (max height {max_height})")]
    AtlasExhausted {
        width: u32,
        height: u32,
        max_height: u32,
    },

    /// A glyph bitmap is wider than the fixed atlas width.
    #[error("glyph {width}x{height} does not fit atlas width {atlas_width}")]
    GlyphTooLarge {
        width: u32,
        height: u32,
        atlas_width: u32,
    },

    /// A rasterizer returned a bitmap that does not match the atlas.
    #[error("invalid glyph bitmap: {0}")]
    InvalidBitmap(String),

    /// The atlas configuration is inconsistent.
    #[error("invalid atlas configuration: {0}")]
    InvalidAtlasConfig(String),

    /// An invalid byte sequence was found in the input text.
    #[error("malformed text: {len} invalid byte(s) at offset {offset}")]
    MalformedText { offset: usize, len: usize },
}

impl TextError {
    /// Whether this error means no further glyphs can be placed.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            TextError::AtlasExhausted { .. } | TextError::GlyphTooLarge { .. }
        )
    }
}

fn scalar(ch: &char) -> u32 {
    u32::from(*ch)
}

/// Result type for text operations.
pub type TextResult<T> = Result<T, TextError>;
