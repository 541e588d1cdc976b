//! Text measurement and hit testing.
//!
//! Layout is a pure function of the input text and the glyph records a
//! [`GlyphSource`] hands out. Lines are stacked top to bottom, each
//! [`line_height`](GlyphSource::line_height) tall, and glyphs advance the pen
//! left to right. Every function here replays the same accumulation, which
//! keeps measurement, caret placement, picking and geometry consistent.
//!
//! Character indices count decoded code points, newlines included.

use crate::decode::code_points;
use crate::glyph_cache::GlyphRecord;
use crate::types::{Color, Point, Size};

/// The code point that ends a line.
pub const NEWLINE: char = '\n';

/// Supplies glyph records and line metrics to layout.
///
/// Lookups cannot fail: sources absorb rasterization and atlas errors and
/// return a blank record that still advances the pen.
pub trait GlyphSource {
    /// The record for `ch`, baking it if needed.
    fn glyph(&mut self, ch: char) -> GlyphRecord;

    /// Baseline-to-baseline distance.
    fn line_height(&self) -> f32;

    /// Distance from a line's top edge to its baseline.
    fn ascent(&self) -> f32;
}

/// Pen and color state while walking a string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    /// Pen x relative to the line start.
    pub x: f32,
    /// Top edge of the current line.
    pub y: f32,
    /// Zero-based line number.
    pub line: usize,
    /// Widest line seen so far.
    pub max_width: f32,
    /// Color applied to the glyphs that follow.
    pub color: Color,
    line_height: f32,
}

impl LayoutCursor {
    /// A white cursor at the start of the first line.
    pub fn new(line_height: f32) -> Self {
        Self::with_color(line_height, Color::WHITE)
    }

    /// A cursor at the start of the first line drawing in `color`.
    pub fn with_color(line_height: f32, color: Color) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            line: 0,
            max_width: 0.0,
            color,
            line_height,
        }
    }

    /// Switch the color for the glyphs that follow.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Move the pen right by `advance`.
    pub fn advance(&mut self, advance: f32) {
        self.x += advance;
        self.max_width = self.max_width.max(self.x);
    }

    /// Start the next line. The color carries over.
    pub fn new_line(&mut self) {
        self.x = 0.0;
        self.y += self.line_height;
        self.line += 1;
    }

    /// Pen position.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Bounding box of everything walked so far; at least one line tall.
    pub fn extent(&self) -> Size {
        Size::new(self.max_width, (self.line + 1) as f32 * self.line_height)
    }
}

/// Measure the bounding box of `text`.
pub fn measure<S: GlyphSource + ?Sized>(source: &mut S, text: &[u8]) -> Size {
    let mut cursor = LayoutCursor::new(source.line_height());
    for ch in code_points(text) {
        if ch == NEWLINE {
            cursor.new_line();
        } else {
            cursor.advance(source.glyph(ch).advance_x);
        }
    }
    cursor.extent()
}

/// Pen position just before the `index`-th code point.
///
/// Indices past the end give the position after the last code point.
pub fn character_position<S: GlyphSource + ?Sized>(
    source: &mut S,
    text: &[u8],
    index: usize,
) -> Point {
    let mut cursor = LayoutCursor::new(source.line_height());
    for ch in code_points(text).take(index) {
        if ch == NEWLINE {
            cursor.new_line();
        } else {
            cursor.advance(source.glyph(ch).advance_x);
        }
    }
    cursor.position()
}

/// Index of the code point under (`x`, `y`).
///
/// The line is chosen from `y` and clamped to the existing lines. Within the
/// line a glyph is picked while `x` lies left of its advance midpoint;
/// exactly on the midpoint picks the following character. Clicking past the
/// end of a line returns the index of its newline, or the code point count on
/// the last line.
pub fn pick_character<S: GlyphSource + ?Sized>(source: &mut S, text: &[u8], x: f32, y: f32) -> usize {
    let line_height = source.line_height();
    let line_count = code_points(text).filter(|&ch| ch == NEWLINE).count() + 1;
    let target = if line_height > 0.0 && y > 0.0 {
        ((y / line_height) as usize).min(line_count - 1)
    } else {
        0
    };

    let mut line = 0;
    let mut pen_x = 0.0;
    let mut index = 0;
    for ch in code_points(text) {
        if line == target {
            if ch == NEWLINE {
                return index;
            }
            let advance = source.glyph(ch).advance_x;
            if x < pen_x + advance / 2.0 {
                return index;
            }
            pen_x += advance;
        } else if ch == NEWLINE {
            line += 1;
        }
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-advance glyphs: 'i' is narrow, 'm' wide, everything else 10.
    struct FixedSource {
        lookups: usize,
    }

    fn advance_of(ch: char) -> f32 {
        match ch {
            'i' => 4.0,
            'm' => 16.0,
            ' ' => 5.0,
            _ => 10.0,
        }
    }

    impl GlyphSource for FixedSource {
        fn glyph(&mut self, ch: char) -> GlyphRecord {
            self.lookups += 1;
            GlyphRecord {
                advance_x: advance_of(ch),
                ..GlyphRecord::default()
            }
        }

        fn line_height(&self) -> f32 {
            20.0
        }

        fn ascent(&self) -> f32 {
            15.0
        }
    }

    fn source() -> FixedSource {
        FixedSource { lookups: 0 }
    }

    #[test]
    fn empty_text_is_one_line_tall() {
        assert_eq!(measure(&mut source(), b""), Size::new(0.0, 20.0));
    }

    #[test]
    fn measure_sums_advances() {
        assert_eq!(measure(&mut source(), b"AB"), Size::new(20.0, 20.0));
        assert_eq!(measure(&mut source(), b"mi"), Size::new(20.0, 20.0));
    }

    #[test]
    fn measure_takes_widest_line() {
        assert_eq!(measure(&mut source(), b"ab\nmmm\nc"), Size::new(48.0, 60.0));
        assert_eq!(measure(&mut source(), b"\n"), Size::new(0.0, 40.0));
    }

    #[test]
    fn newlines_are_not_looked_up() {
        let mut src = source();
        measure(&mut src, b"a\n\nb");
        assert_eq!(src.lookups, 2);
    }

    #[test]
    fn character_positions() {
        let mut src = source();
        assert_eq!(character_position(&mut src, b"AB", 0), Point::new(0.0, 0.0));
        assert_eq!(character_position(&mut src, b"AB", 1), Point::new(10.0, 0.0));
        assert_eq!(character_position(&mut src, b"AB", 2), Point::new(20.0, 0.0));
        assert_eq!(character_position(&mut src, b"AB", 9), Point::new(20.0, 0.0));
        assert_eq!(character_position(&mut src, b"ab\ncd", 3), Point::new(0.0, 20.0));
        assert_eq!(character_position(&mut src, b"ab\ncd", 4), Point::new(10.0, 20.0));
    }

    #[test]
    fn positions_count_code_points_not_bytes() {
        let mut src = source();
        let text = "éé".as_bytes();
        assert_eq!(text.len(), 4);
        assert_eq!(character_position(&mut src, text, 1), Point::new(10.0, 0.0));
    }

    #[test]
    fn pick_uses_advance_midpoint() {
        let mut src = source();
        let text = b"mi";
        assert_eq!(pick_character(&mut src, text, 0.0, 5.0), 0);
        assert_eq!(pick_character(&mut src, text, 7.9, 5.0), 0);
        // Exactly on the midpoint selects the following character.
        assert_eq!(pick_character(&mut src, text, 8.0, 5.0), 1);
        assert_eq!(pick_character(&mut src, text, 17.9, 5.0), 1);
        assert_eq!(pick_character(&mut src, text, 18.0, 5.0), 2);
        assert_eq!(pick_character(&mut src, text, 500.0, 5.0), 2);
    }

    #[test]
    fn pick_clamps_lines() {
        let mut src = source();
        let text = b"ab\ncd";
        assert_eq!(pick_character(&mut src, text, 500.0, 5.0), 2);
        assert_eq!(pick_character(&mut src, text, 0.0, 25.0), 3);
        assert_eq!(pick_character(&mut src, text, 12.0, 1000.0), 4);
        assert_eq!(pick_character(&mut src, text, 12.0, -40.0), 1);
        assert_eq!(pick_character(&mut src, text, -3.0, 5.0), 0);
    }

    #[test]
    fn pick_on_empty_text() {
        assert_eq!(pick_character(&mut source(), b"", 10.0, 10.0), 0);
    }

    #[test]
    fn pick_inverts_character_position() {
        let mut src = source();
        let text = "mim i\n\nwide line\nx".as_bytes();
        let count = code_points(text).count();
        for i in 0..=count {
            let p = character_position(&mut src, text, i);
            assert_eq!(pick_character(&mut src, text, p.x, p.y), i, "index {i}");
        }
    }

    #[test]
    fn cursor_extent_tracks_lines() {
        let mut cursor = LayoutCursor::new(12.0);
        cursor.advance(30.0);
        cursor.new_line();
        cursor.advance(10.0);
        assert_eq!(cursor.extent(), Size::new(30.0, 24.0));
        assert_eq!(cursor.position(), Point::new(10.0, 12.0));
    }

    #[test]
    fn cursor_color_survives_line_breaks() {
        let mut cursor = LayoutCursor::with_color(12.0, Color::GREEN);
        cursor.advance(10.0);
        cursor.set_color(Color::RED);
        cursor.new_line();
        assert_eq!(cursor.color, Color::RED);
        assert_eq!(LayoutCursor::new(12.0).color, Color::WHITE);
    }
}
