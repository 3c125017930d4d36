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

//! Source positions.
//!
//! Positions are zero-based. Columns are byte offsets within the line, which is
//! what tree-sitter reports; conversion to editor encodings happens at the
//! protocol boundary.

use std::fmt;

/// A zero-based (line, byte column) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based byte offset within the line.
    pub column: usize,
}

impl Point {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(point: tree_sitter::Point) -> Self {
        Self {
            line: point.row,
            column: point.column,
        }
    }
}

impl From<Point> for tree_sitter::Point {
    fn from(point: Point) -> Self {
        tree_sitter::Point {
            row: point.line,
            column: point.column,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A half-open source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

impl Span {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Span covering `start..end` columns of a single line.
    pub fn on_line(line: usize, start: usize, end: usize) -> Self {
        Self {
            start: Point::new(line, start),
            end: Point::new(line, end),
        }
    }

    /// Span of a tree-sitter node.
    pub fn of(node: &tree_sitter::Node<'_>) -> Self {
        Self {
            start: node.start_position().into(),
            end: node.end_position().into(),
        }
    }

    /// Number of lines touched by this span, minus one.
    pub fn line_count(&self) -> usize {
        self.end.line.saturating_sub(self.start.line)
    }

    pub fn is_multiline(&self) -> bool {
        self.end.line > self.start.line
    }

    pub fn contains(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ordering() {
        assert!(Point::new(0, 10) < Point::new(1, 0));
        assert!(Point::new(2, 3) < Point::new(2, 4));
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(Point::new(1, 2), Point::new(3, 0));
        assert!(span.contains(Point::new(1, 2)));
        assert!(span.contains(Point::new(2, 100)));
        assert!(span.contains(Point::new(3, 0)));
        assert!(!span.contains(Point::new(1, 1)));
        assert!(!span.contains(Point::new(3, 1)));
    }

    #[test]
    fn test_multiline() {
        assert!(!Span::on_line(4, 0, 8).is_multiline());
        let span = Span::new(Point::new(1, 0), Point::new(5, 3));
        assert!(span.is_multiline());
        assert_eq!(span.line_count(), 4);
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(Point::new(0, 0).to_string(), "1:1");
        assert_eq!(Span::on_line(2, 4, 6).to_string(), "3:5-3:7");
    }
}
