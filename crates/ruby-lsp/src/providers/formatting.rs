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

//! Whitespace formatting.
//!
//! Removes trailing whitespace, expands tabs in indentation and leaves exactly
//! one newline at the end of the file. Text inside multi-line string literals
//! and heredocs is never touched.

use crate::config::FormatSettings;
use crate::constants::POSITION_ZERO;
use crate::forest::SyntaxTree;
use crate::utils::LineIndex;
use ruby_syntax::walk::{walk, Visit};
use ruby_syntax::{ParsedSource, Span};
use std::collections::HashSet;
use tower_lsp::lsp_types::{Position, Range, TextEdit};
use tracing::{debug, warn};

const LITERAL_KINDS: &[&str] = &["string", "heredoc_body", "regex", "string_array", "symbol_array", "subshell"];

/// Rows inside a literal: their ends belong to the literal (`open`) or their
/// starts do (`continued`).
#[derive(Default)]
struct LiteralRows {
    open: HashSet<usize>,
    continued: HashSet<usize>,
}

fn literal_rows(source: &ParsedSource) -> LiteralRows {
    let mut rows = LiteralRows::default();
    let Some(root) = source.root_node() else {
        return rows;
    };
    walk(root, |node| {
        if LITERAL_KINDS.contains(&node.kind()) {
            let span = Span::of(&node);
            if span.is_multiline() {
                rows.open.extend(span.start.line..span.end.line);
                rows.continued.extend(span.start.line + 1..=span.end.line);
            }
            return Visit::Skip;
        }
        Visit::Descend
    });
    rows
}

/// Normalize whitespace in `source`, keeping literal content intact.
pub fn format_text(source: &ParsedSource, indent_width: usize) -> String {
    let text = source.text();
    let rows = literal_rows(source);
    let indent = " ".repeat(indent_width);

    let mut lines: Vec<String> = text
        .split('\n')
        .enumerate()
        .map(|(row, raw)| {
            let (line, cr) = match raw.strip_suffix('\r') {
                Some(line) => (line, "\r"),
                None => (raw, ""),
            };
            let line = if rows.open.contains(&row) {
                line
            } else {
                line.trim_end_matches([' ', '\t'])
            };
            let line = if rows.continued.contains(&row) {
                line.to_string()
            } else {
                expand_indentation(line, &indent)
            };
            format!("{}{}", line, cr)
        })
        .collect();

    while lines.last().is_some_and(|line| line.trim_end_matches('\r').is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut formatted = lines.join("\n");
    formatted.push('\n');
    formatted
}

fn expand_indentation(line: &str, indent: &str) -> String {
    let body = line.trim_start_matches([' ', '\t']);
    let leading = &line[..line.len() - body.len()];
    if !leading.contains('\t') {
        return line.to_string();
    }
    let expanded: String = leading
        .chars()
        .map(|c| if c == '\t' { indent } else { " " })
        .collect();
    format!("{}{}", expanded, body)
}

/// A single whole-document edit, or `None` when formatting is disabled, the
/// document does not parse, or nothing would change.
pub fn get_formatting_edits(tree: &SyntaxTree, settings: &FormatSettings) -> Option<Vec<TextEdit>> {
    if !settings.enabled {
        debug!("Formatting disabled for {}", tree.uri);
        return None;
    }
    if tree.source.has_errors() {
        warn!(
            "Cannot format {}: document has {} syntax errors",
            tree.uri,
            tree.source.errors().len()
        );
        return None;
    }

    let content = tree.text();
    let formatted = format_text(&tree.source, settings.indent_width);
    if formatted == content {
        debug!("Document {} is already formatted correctly", tree.uri);
        return None;
    }

    debug!(
        "Formatting {} changes {} lines to {} lines",
        tree.uri,
        content.lines().count(),
        formatted.lines().count()
    );
    Some(vec![TextEdit {
        range: Range {
            start: Position {
                line: POSITION_ZERO,
                character: POSITION_ZERO,
            },
            end: LineIndex::new(content).end_position(),
        },
        new_text: formatted,
    }])
}
