//! The GPU binding seam of the glyph atlas.
//!
//! The atlas never talks to a graphics API directly. It owns an
//! [`AtlasTexture`], allocates it once at the atlas's maximum size and tells
//! it which sub-regions of the CPU buffer changed. Uploads happen
//! synchronously inside the operation that modified the buffer, so a texture
//! handle obtained afterwards always reflects every issued UV.

use crate::atlas::AtlasRect;
use crate::raster::PixelFormat;

/// A borrowed view of the atlas pixel buffer.
#[derive(Debug, Clone, Copy)]
pub struct AtlasPixels<'a> {
    /// Row-major pixel data covering the rows grown so far.
    pub data: &'a [u8],
    /// Atlas width in texels.
    pub width: u32,
    /// Rows grown so far; the texture may be taller.
    pub height: u32,
    /// Pixel layout of `data`.
    pub format: PixelFormat,
}

impl AtlasPixels<'_> {
    /// Bytes in one atlas row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Byte offset of texel (x, y).
    pub fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * self.format.bytes_per_pixel()
    }
}

/// Receives atlas pixels and exposes the texture that renderers bind.
pub trait AtlasTexture {
    /// What renderers bind when drawing text.
    type Handle: Clone;

    /// Create the texture at the given dimensions, zero filled.
    ///
    /// The atlas calls this once, with its maximum height.
    fn allocate(&mut self, width: u32, height: u32, format: PixelFormat);

    /// Copy `region` of the atlas buffer into the texture.
    fn upload_region(&mut self, pixels: AtlasPixels<'_>, region: AtlasRect);

    /// The texture to bind for drawing.
    fn handle(&self) -> Self::Handle;
}

/// Identifies one allocation of a [`HeadlessTexture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessHandle {
    /// Increments on every reallocation.
    pub generation: u32,
    pub width: u32,
    pub height: u32,
}

/// An in-memory texture that mirrors the atlas.
///
/// Useful for software renderers that sample glyph coverage on the CPU and
/// for verifying upload ordering.
#[derive(Debug, Clone, Default)]
pub struct HeadlessTexture {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    generation: u32,
    uploads: usize,
}

impl HeadlessTexture {
    /// Create an empty texture. The atlas allocates it on construction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrored pixel data, laid out like the atlas buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Current texture dimensions.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of allocations so far.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of region uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }
}

impl AtlasTexture for HeadlessTexture {
    type Handle = HeadlessHandle;

    fn allocate(&mut self, width: u32, height: u32, format: PixelFormat) {
        self.width = width;
        self.height = height;
        self.format = format;
        self.pixels = vec![0; width as usize * height as usize * format.bytes_per_pixel()];
        self.generation += 1;
    }

    fn upload_region(&mut self, pixels: AtlasPixels<'_>, region: AtlasRect) {
        debug_assert_eq!(pixels.width, self.width);
        debug_assert!(pixels.height <= self.height);
        // Same width, so buffer and texture share byte offsets.
        let row_bytes = region.width as usize * self.format.bytes_per_pixel();
        for row in region.y..region.y + region.height {
            let start = pixels.offset(region.x, row);
            self.pixels[start..start + row_bytes]
                .copy_from_slice(&pixels.data[start..start + row_bytes]);
        }
        self.uploads += 1;
    }

    fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            generation: self.generation,
            width: self.width,
            height: self.height,
        }
    }
}
