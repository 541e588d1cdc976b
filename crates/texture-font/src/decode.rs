//! Byte string to code point decoding.
//!
//! Text arrives as raw bytes that are expected to be UTF-8. Each maximal
//! invalid subsequence decodes to a single U+FFFD so layout never aborts on
//! bad input.

use std::str::{Chars, Utf8Chunks};

use tracing::trace;

use crate::error::TextError;

/// The code point substituted for malformed byte sequences.
pub const REPLACEMENT_CHARACTER: char = char::REPLACEMENT_CHARACTER;

/// Iterator over the code points of a byte string.
#[derive(Clone)]
pub struct CodePoints<'a> {
    chunks: Utf8Chunks<'a>,
    current: Chars<'a>,
    /// Offset of the invalid bytes that follow `current`, if any.
    pending_invalid: Option<(usize, usize)>,
    /// Byte offset of the next chunk.
    offset: usize,
    malformed: usize,
}

impl<'a> CodePoints<'a> {
    /// Decode `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            chunks: bytes.utf8_chunks(),
            current: "".chars(),
            pending_invalid: None,
            offset: 0,
            malformed: 0,
        }
    }

    /// Number of malformed sequences replaced so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

impl Iterator for CodePoints<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(ch) = self.current.next() {
                return Some(ch);
            }
            if let Some((offset, len)) = self.pending_invalid.take() {
                self.malformed += 1;
                trace!(error = %TextError::MalformedText { offset, len }, "replacing malformed text");
                return Some(REPLACEMENT_CHARACTER);
            }

            let chunk = self.chunks.next()?;
            let valid = chunk.valid();
            let invalid = chunk.invalid();
            self.current = valid.chars();
            if !invalid.is_empty() {
                self.pending_invalid = Some((self.offset + valid.len(), invalid.len()));
            }
            self.offset += valid.len() + invalid.len();
        }
    }
}

/// Decode a byte string into code points.
pub fn code_points(text: &[u8]) -> CodePoints<'_> {
    CodePoints::new(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<char> {
        code_points(bytes).collect()
    }

    #[test]
    fn valid_utf8_round_trips() {
        assert_eq!(decode("aé€😀".as_bytes()), vec!['a', 'é', '€', '😀']);
        assert!(decode(b"").is_empty());
    }

    #[test]
    fn invalid_byte_becomes_single_replacement() {
        assert_eq!(decode(b"a\xFFb"), vec!['a', REPLACEMENT_CHARACTER, 'b']);
    }

    #[test]
    fn truncated_sequence_is_one_replacement() {
        // First two bytes of the three byte encoding of '€'.
        assert_eq!(decode(b"x\xE2\x82"), vec!['x', REPLACEMENT_CHARACTER]);
    }

    #[test]
    fn consecutive_invalid_sequences_each_replace() {
        let mut iter = code_points(b"\xC0\xC1ok");
        let chars: Vec<char> = iter.by_ref().collect();
        assert_eq!(
            chars,
            vec![REPLACEMENT_CHARACTER, REPLACEMENT_CHARACTER, 'o', 'k']
        );
        assert_eq!(iter.malformed(), 2);
    }

    #[test]
    fn matches_lossy_conversion() {
        let samples: [&[u8]; 4] = [b"plain", b"\xF0\x9F\x98", b"a\x80\x80b", b"\xEF\xBF\xBD!"];
        for bytes in samples {
            let lossy: Vec<char> = String::from_utf8_lossy(bytes).chars().collect();
            assert_eq!(decode(bytes), lossy);
        }
    }
}
