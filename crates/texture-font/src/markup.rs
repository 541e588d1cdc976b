//! Color markers embedded in text.
//!
//! A marker is `#` followed by exactly three hex digits, `#rgb`, and switches
//! the active color for every following glyph. Each nibble expands to the
//! full 0-255 range (`f` becomes 255). Alpha is kept from the color in effect.
//! A `#` that is not followed by three hex digits is ordinary text.

use std::collections::VecDeque;

use crate::types::Color;

/// Byte that opens a color marker.
pub const MARKER_START: char = '#';

/// Hex digits in a marker.
const MARKER_DIGITS: usize = 3;

/// One unit of markup-aware text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkupToken {
    /// A code point to lay out.
    Glyph(char),
    /// Switch the active color.
    Color(Color),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    NormalText,
    InMarker { digits: [u8; MARKER_DIGITS], len: usize },
}

/// Splits a code point stream into glyphs and color changes.
#[derive(Debug, Clone)]
pub struct MarkupScanner<I> {
    input: I,
    state: ScanState,
    /// Code points to scan again before reading more input.
    replay: VecDeque<char>,
    /// Tokens decided but not yet returned.
    output: VecDeque<MarkupToken>,
    color: Color,
}

impl<I: Iterator<Item = char>> MarkupScanner<I> {
    /// Scan `input` starting with `color` in effect.
    pub fn new(input: I, color: Color) -> Self {
        Self {
            input,
            state: ScanState::NormalText,
            replay: VecDeque::new(),
            output: VecDeque::new(),
            color,
        }
    }

    /// The color in effect after the tokens returned so far.
    pub fn color(&self) -> Color {
        self.color
    }

    fn next_char(&mut self) -> Option<char> {
        self.replay.pop_front().or_else(|| self.input.next())
    }

    /// Emit an unfinished marker as literal text and rescan `next`.
    fn abandon_marker(&mut self, digits: [u8; MARKER_DIGITS], len: usize, next: Option<char>) {
        self.output.push_back(MarkupToken::Glyph(MARKER_START));
        for &d in &digits[..len] {
            self.output.push_back(MarkupToken::Glyph(char::from(d)));
        }
        if let Some(ch) = next {
            self.replay.push_front(ch);
        }
        self.state = ScanState::NormalText;
    }

    fn marker_color(&self, digits: [u8; MARKER_DIGITS]) -> Color {
        let channel = |d: u8| {
            let nibble = char::from(d).to_digit(16).unwrap_or(0) as u8;
            f32::from(nibble * 17) / 255.0
        };
        Color::new(
            channel(digits[0]),
            channel(digits[1]),
            channel(digits[2]),
            self.color.a,
        )
    }
}

impl<I: Iterator<Item = char>> Iterator for MarkupScanner<I> {
    type Item = MarkupToken;

    fn next(&mut self) -> Option<MarkupToken> {
        loop {
            if let Some(token) = self.output.pop_front() {
                return Some(token);
            }

            let next = self.next_char();
            match (self.state, next) {
                (ScanState::NormalText, None) => return None,
                (ScanState::NormalText, Some(MARKER_START)) => {
                    self.state = ScanState::InMarker {
                        digits: [0; MARKER_DIGITS],
                        len: 0,
                    };
                }
                (ScanState::NormalText, Some(ch)) => return Some(MarkupToken::Glyph(ch)),
                (ScanState::InMarker { mut digits, len }, Some(ch)) if ch.is_ascii_hexdigit() => {
                    digits[len] = ch as u8;
                    if len + 1 == MARKER_DIGITS {
                        self.state = ScanState::NormalText;
                        self.color = self.marker_color(digits);
                        return Some(MarkupToken::Color(self.color));
                    }
                    self.state = ScanState::InMarker {
                        digits,
                        len: len + 1,
                    };
                }
                (ScanState::InMarker { digits, len }, other) => {
                    self.abandon_marker(digits, len, other);
                }
            }
        }
    }
}

/// Scan a code point stream for color markers.
pub fn scan<I: Iterator<Item = char>>(input: I, color: Color) -> MarkupScanner<I> {
    MarkupScanner::new(input, color)
}
