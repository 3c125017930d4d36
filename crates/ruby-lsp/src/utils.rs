// Dweve Ruby Language Server
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Position conversion between the parser and the protocol.
//!
//! The parser reports byte columns; LSP positions count UTF-16 code units.
//! Every conversion here clamps out-of-range input instead of panicking.

use ruby_syntax::{Point, Span};
use tower_lsp::lsp_types::{Position, Range};

/// Safely get a string slice up to a byte position, rounding down to a UTF-8
/// character boundary.
///
/// # Example
///
/// ```
/// use ruby_lsp::utils::safe_slice_to;
///
/// let s = "Hello 世界";
/// assert_eq!(safe_slice_to(s, 6), "Hello ");
/// // Position 7 would be mid-character, so it rounds down to 6
/// assert_eq!(safe_slice_to(s, 7), "Hello ");
/// ```
pub fn safe_slice_to(s: &str, byte_pos: usize) -> &str {
    if byte_pos >= s.len() {
        return s;
    }
    let mut pos = byte_pos;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    &s[..pos]
}

/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> u32 {
    s.chars().map(|c| c.len_utf16() as u32).sum()
}

/// Convert a byte column within `line` to a UTF-16 column.
pub fn byte_to_utf16_column(line: &str, byte_column: usize) -> u32 {
    utf16_len(safe_slice_to(line, byte_column))
}

/// Convert a UTF-16 column within `line` to a byte column.
///
/// Columns past the end of the line clamp to the line length; a column in the
/// middle of a surrogate pair resolves to the start of that character.
pub fn utf16_to_byte_column(line: &str, utf16_column: u32) -> usize {
    let mut units = 0u32;
    for (byte, c) in line.char_indices() {
        let next = units + c.len_utf16() as u32;
        if next > utf16_column {
            return byte;
        }
        units = next;
    }
    line.len()
}

/// Line table for converting between [`Point`]/[`Span`] and LSP positions.
///
/// Rows are split on `\n` only, which matches how the parser counts rows.
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
        }
    }

    pub fn line(&self, row: usize) -> &'a str {
        self.lines.get(row).copied().unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn position(&self, point: Point) -> Position {
        Position {
            line: point.line as u32,
            character: byte_to_utf16_column(self.line(point.line), point.column),
        }
    }

    pub fn range(&self, span: Span) -> Range {
        Range {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }

    pub fn point(&self, position: Position) -> Point {
        let row = position.line as usize;
        Point::new(row, utf16_to_byte_column(self.line(row), position.character))
    }

    /// Position just past the last character of the text.
    pub fn end_position(&self) -> Position {
        let last = self.lines.len().saturating_sub(1);
        Position {
            line: last as u32,
            character: utf16_len(self.line(last)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_slice_to_utf8() {
        let s = "Hello 世界";
        assert_eq!(safe_slice_to(s, 6), "Hello ");
        assert_eq!(safe_slice_to(s, 7), "Hello ");
        assert_eq!(safe_slice_to(s, 8), "Hello ");
        assert_eq!(safe_slice_to(s, 9), "Hello 世");
        assert_eq!(safe_slice_to(s, 100), s);
    }

    #[test]
    fn test_utf16_columns() {
        let line = "a = '😀' + b";
        // 😀 is 4 bytes and 2 UTF-16 units, starting at byte 5.
        assert_eq!(byte_to_utf16_column(line, 5), 5);
        assert_eq!(byte_to_utf16_column(line, 9), 7);
        assert_eq!(utf16_to_byte_column(line, 7), 9);
        assert_eq!(utf16_to_byte_column(line, 6), 5);
        assert_eq!(utf16_to_byte_column(line, 100), line.len());
    }

    #[test]
    fn test_line_index_round_trip() {
        let index = LineIndex::new("def foo\n  \"é\"\nend");
        let position = Position { line: 1, character: 4 };
        let point = index.point(position);
        assert_eq!(point, Point::new(1, 5));
        assert_eq!(index.position(point), position);
    }

    #[test]
    fn test_line_index_clamps() {
        let index = LineIndex::new("x\n");
        assert_eq!(index.line(10), "");
        assert_eq!(index.point(Position { line: 10, character: 3 }), Point::new(10, 0));
        assert_eq!(index.end_position(), Position { line: 1, character: 0 });
    }
}
