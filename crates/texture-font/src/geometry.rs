//! Textured quad geometry for laid out text.
//!
//! Each visible glyph becomes one quad: four [`TextVertex`] values and six
//! indices. Geometry is built against a [`GlyphSource`] with the same pen walk
//! as measurement, so quads line up exactly with measured extents.

use bytemuck::{Pod, Zeroable};

use crate::decode::code_points;
use crate::layout::{GlyphSource, LayoutCursor, NEWLINE};
use crate::markup::{MarkupToken, scan};
use crate::types::{Color, Point, Rect};

/// Vertex for textured glyph quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Position in pixels, y down.
    pub position: [f32; 2],
    /// Normalized atlas coordinates.
    pub uv: [f32; 2],
    /// Straight alpha color.
    pub color: [f32; 4],
}

static_assertions::assert_eq_size!(TextVertex, [f32; 8]);

impl TextVertex {
    pub fn new(position: [f32; 2], uv: [f32; 2], color: Color) -> Self {
        Self {
            position,
            uv,
            color: color.to_array(),
        }
    }

    #[cfg(feature = "wgpu")]
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // uv
        2 => Float32x4, // color
    ];

    /// Vertex buffer layout matching this struct.
    #[cfg(feature = "wgpu")]
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Vertices and triangle indices for a batch of glyph quads.
///
/// Building appends, so several strings can share one buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextGeometry {
    vertices: Vec<TextVertex>,
    indices: Vec<u32>,
}

impl TextGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all quads, keeping the allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of glyph quads.
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn vertices(&self) -> &[TextVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Smallest rectangle covering every quad, `None` when empty.
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.vertices.first()?;
        let mut min = Point::from(first.position);
        let mut max = min;
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.position[0]);
            min.y = min.y.min(v.position[1]);
            max.x = max.x.max(v.position[0]);
            max.y = max.y.max(v.position[1]);
        }
        Some(Rect::from_corners(min, max))
    }

    /// Append one quad; vertices run clockwise from the top-left corner.
    fn push_quad(&mut self, rect: Rect, uv_min: [f32; 2], uv_max: [f32; 2], color: Color) {
        let [u0, v0] = uv_min;
        let [u1, v1] = uv_max;
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[
            TextVertex::new([rect.left(), rect.top()], [u0, v0], color),
            TextVertex::new([rect.right(), rect.top()], [u1, v0], color),
            TextVertex::new([rect.right(), rect.bottom()], [u1, v1], color),
            TextVertex::new([rect.left(), rect.bottom()], [u0, v1], color),
        ]);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Append quads for a token stream and return the color in effect at the end.
///
/// Each quad takes its UVs from the glyph record, so quads already in
/// `geometry` stay valid when a later lookup grows the atlas.
pub fn build<S, I>(
    source: &mut S,
    tokens: I,
    origin: Point,
    color: Color,
    geometry: &mut TextGeometry,
) -> Color
where
    S: GlyphSource + ?Sized,
    I: IntoIterator<Item = MarkupToken>,
{
    let ascent = source.ascent();
    let mut cursor = LayoutCursor::with_color(source.line_height(), color);

    for token in tokens {
        let ch = match token {
            MarkupToken::Color(c) => {
                cursor.set_color(c);
                continue;
            }
            MarkupToken::Glyph(NEWLINE) => {
                cursor.new_line();
                continue;
            }
            MarkupToken::Glyph(ch) => ch,
        };

        let glyph = source.glyph(ch);
        if glyph.width > 0.0 && glyph.height > 0.0 && !glyph.is_blank() {
            let pen = cursor.position();
            let rect = Rect::new(
                origin.x + pen.x + glyph.offset_x as f32,
                origin.y + pen.y + ascent - glyph.offset_y as f32,
                glyph.width,
                glyph.height,
            );
            geometry.push_quad(rect, glyph.uv_min, glyph.uv_max, cursor.color);
        }
        cursor.advance(glyph.advance_x);
    }
    cursor.color
}

/// Append quads for plain text; `#` has no special meaning.
pub fn build_text<S: GlyphSource + ?Sized>(
    source: &mut S,
    text: &[u8],
    origin: Point,
    color: Color,
    geometry: &mut TextGeometry,
) {
    let tokens = code_points(text).map(MarkupToken::Glyph);
    build(source, tokens, origin, color, geometry);
}

/// Append quads for text with `#rgb` color markers and return the final color.
pub fn build_markup<S: GlyphSource + ?Sized>(
    source: &mut S,
    text: &[u8],
    origin: Point,
    color: Color,
    geometry: &mut TextGeometry,
) -> Color {
    build(source, scan(code_points(text), color), origin, color, geometry)
}
