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

//! Folding ranges for multi-line constructs and comment blocks.

use crate::forest::SyntaxTree;
use ruby_syntax::walk::{walk, Visit};
use ruby_syntax::Span;
use tower_lsp::lsp_types::{FoldingRange, FoldingRangeKind};

/// Constructs whose closing line (`end`, `}`, `]`, heredoc terminator) stays
/// visible when folded.
const FOLDABLE_KINDS: &[&str] = &[
    "class",
    "module",
    "singleton_class",
    "method",
    "singleton_method",
    "do_block",
    "block",
    "lambda",
    "if",
    "unless",
    "while",
    "until",
    "for",
    "case",
    "case_match",
    "begin",
    "array",
    "hash",
    "heredoc_body",
];

pub fn get_folding_ranges(tree: &SyntaxTree) -> Vec<FoldingRange> {
    let source = &tree.source;
    let Some(root) = source.root_node() else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let mut comments: Option<(usize, usize)> = None;

    walk(root, |node| {
        let kind = node.kind();
        if kind == "comment" {
            let span = Span::of(&node);
            let own_line = source
                .line(span.start.line)
                .is_some_and(|line| line[..span.start.column.min(line.len())].trim().is_empty());
            if own_line {
                comments = match comments {
                    Some((start, end)) if end + 1 == span.start.line => Some((start, span.end.line)),
                    previous => {
                        push_comment_block(&mut ranges, previous);
                        Some((span.start.line, span.end.line))
                    }
                };
            }
            return Visit::Skip;
        }

        if FOLDABLE_KINDS.contains(&kind) {
            let span = Span::of(&node);
            // The closing line is the last line of the node; fold up to the line before it.
            let end_line = span.end.line.saturating_sub(1);
            if end_line > span.start.line {
                ranges.push(FoldingRange {
                    start_line: span.start.line as u32,
                    end_line: end_line as u32,
                    kind: Some(FoldingRangeKind::Region),
                    ..Default::default()
                });
            }
        }
        Visit::Descend
    });
    push_comment_block(&mut ranges, comments);

    ranges.sort_by_key(|range| (range.start_line, std::cmp::Reverse(range.end_line)));
    ranges
}

fn push_comment_block(ranges: &mut Vec<FoldingRange>, block: Option<(usize, usize)>) {
    if let Some((start, end)) = block.filter(|(start, end)| end > start) {
        ranges.push(FoldingRange {
            start_line: start as u32,
            end_line: end as u32,
            kind: Some(FoldingRangeKind::Comment),
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruby_syntax::RubyParser;
    use tower_lsp::lsp_types::Url;

    fn folds(text: &str) -> Vec<(u32, u32, FoldingRangeKind)> {
        let tree = SyntaxTree {
            uri: Url::parse("file:///fold.rb").unwrap(),
            version: 1,
            source: RubyParser::new().unwrap().parse(text),
        };
        get_folding_ranges(&tree)
            .into_iter()
            .map(|r| (r.start_line, r.end_line, r.kind.unwrap()))
            .collect()
    }

    #[test]
    fn test_nested_definitions() {
        let text = "class Greeter\n  def hello\n    puts 'hi'\n  end\nend\n";
        assert_eq!(
            folds(text),
            vec![(0, 3, FoldingRangeKind::Region), (1, 2, FoldingRangeKind::Region)]
        );
    }

    #[test]
    fn test_single_line_constructs_do_not_fold() {
        assert!(folds("def a; end\nx = [1, 2]\n").is_empty());
    }

    #[test]
    fn test_comment_blocks() {
        let text = "# one\n# two\n# three\nx = 1 # trailing\n\n# lone\n";
        assert_eq!(folds(text), vec![(0, 2, FoldingRangeKind::Comment)]);
    }

    #[test]
    fn test_multiline_hash() {
        let text = "OPTS = {\n  a: 1,\n  b: 2\n}\n";
        assert_eq!(folds(text), vec![(0, 2, FoldingRangeKind::Region)]);
    }
}
