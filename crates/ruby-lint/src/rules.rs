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

//! Lint rules

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::LintError;
use crate::runner::LintContext;
use ruby_syntax::walk::{walk, Visit};
use ruby_syntax::{ParsedSource, Point, Span};
use std::collections::{HashMap, HashSet};

/// Configuration for a single rule
#[derive(Debug, Clone)]
pub struct RuleConfig {
    /// Whether the rule is enabled
    pub enabled: bool,
    /// Whether to treat findings as errors
    pub error: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error: false,
        }
    }
}

/// Trait for lint rules
pub trait LintRule: Send + Sync {
    /// Rule identifier
    fn id(&self) -> &str;

    /// Rule description
    fn description(&self) -> &str;

    /// Run the rule on a parsed source.
    ///
    /// Returning `Err` reports a failure of the rule itself; problems found in
    /// the source are returned as diagnostics.
    fn check(
        &self,
        source: &ParsedSource,
        context: &LintContext,
    ) -> Result<Vec<Diagnostic>, LintError>;
}

/// Node kinds whose contents are literal text rather than code.
const LITERAL_KINDS: &[&str] = &["string", "heredoc_body", "regex", "string_array", "symbol_array", "subshell"];

/// Rows on which literal text continues past the end of the line.
///
/// Whitespace rules ignore these rows: trailing spaces or tabs there belong to
/// the literal's value.
fn literal_rows(source: &ParsedSource) -> HashSet<usize> {
    let mut rows = HashSet::new();
    let Some(root) = source.root_node() else {
        return rows;
    };
    walk(root, |node| {
        if LITERAL_KINDS.contains(&node.kind()) {
            let span = Span::of(&node);
            if span.is_multiline() {
                rows.extend(span.start.line..span.end.line);
            }
            return Visit::Skip;
        }
        Visit::Descend
    });
    rows
}

/// Rule: syntax errors recovered by the parser
pub struct SyntaxRule;

impl LintRule for SyntaxRule {
    fn id(&self) -> &str {
        "syntax"
    }

    fn description(&self) -> &str {
        "Report source the parser could not understand"
    }

    fn check(&self, source: &ParsedSource, _context: &LintContext) -> Result<Vec<Diagnostic>, LintError> {
        Ok(source
            .errors()
            .iter()
            .map(|err| {
                let diag = Diagnostic::error(DiagnosticKind::Syntax, err.message.clone(), self.id(), err.span);
                match &err.kind {
                    ruby_syntax::SyntaxErrorKind::Missing(token) => {
                        diag.with_suggestion(format!("insert `{}`", token))
                    }
                    _ => diag,
                }
            })
            .collect())
    }
}

/// Rule: maximum line length
pub struct LineLengthRule;

impl LintRule for LineLengthRule {
    fn id(&self) -> &str {
        "line-length"
    }

    fn description(&self) -> &str {
        "Check that lines do not exceed the configured length"
    }

    fn check(&self, source: &ParsedSource, context: &LintContext) -> Result<Vec<Diagnostic>, LintError> {
        let max = context.max_line_length;
        let mut diagnostics = Vec::new();
        for (row, line) in source.text().lines().enumerate() {
            let length = line.chars().count();
            if length <= max {
                continue;
            }
            // Byte offset of the first character past the limit.
            let start = line.char_indices().nth(max).map(|(i, _)| i).unwrap_or(line.len());
            diagnostics.push(Diagnostic::convention(
                DiagnosticKind::LineLength,
                format!("Line is too long. [{}/{}]", length, max),
                self.id(),
                Span::on_line(row, start, line.len()),
            ));
        }
        Ok(diagnostics)
    }
}

/// Rule: trailing whitespace
pub struct TrailingWhitespaceRule;

impl LintRule for TrailingWhitespaceRule {
    fn id(&self) -> &str {
        "trailing-whitespace"
    }

    fn description(&self) -> &str {
        "Check for whitespace at the end of lines"
    }

    fn check(&self, source: &ParsedSource, _context: &LintContext) -> Result<Vec<Diagnostic>, LintError> {
        let skip = literal_rows(source);
        let mut diagnostics = Vec::new();
        for (row, line) in source.text().lines().enumerate() {
            if skip.contains(&row) {
                continue;
            }
            let trimmed = line.trim_end_matches([' ', '\t']);
            if trimmed.len() < line.len() {
                diagnostics.push(
                    Diagnostic::convention(
                        DiagnosticKind::TrailingWhitespace,
                        "Trailing whitespace detected.",
                        self.id(),
                        Span::on_line(row, trimmed.len(), line.len()),
                    )
                    .with_suggestion("remove trailing whitespace"),
                );
            }
        }
        Ok(diagnostics)
    }
}

/// Rule: tabs in indentation
pub struct TabIndentationRule;

impl LintRule for TabIndentationRule {
    fn id(&self) -> &str {
        "tab-indentation"
    }

    fn description(&self) -> &str {
        "Check that indentation uses spaces"
    }

    fn check(&self, source: &ParsedSource, _context: &LintContext) -> Result<Vec<Diagnostic>, LintError> {
        let skip = literal_rows(source);
        let mut diagnostics = Vec::new();
        for (row, line) in source.text().lines().enumerate() {
            if skip.contains(&row) {
                continue;
            }
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            if line[..indent].contains('\t') {
                diagnostics.push(Diagnostic::convention(
                    DiagnosticKind::TabIndentation,
                    "Tab detected in indentation.",
                    self.id(),
                    Span::on_line(row, 0, indent),
                ));
            }
        }
        Ok(diagnostics)
    }
}

/// Rule: final newline
pub struct FinalNewlineRule;

impl LintRule for FinalNewlineRule {
    fn id(&self) -> &str {
        "final-newline"
    }

    fn description(&self) -> &str {
        "Check that the file ends with a newline"
    }

    fn check(&self, source: &ParsedSource, _context: &LintContext) -> Result<Vec<Diagnostic>, LintError> {
        let text = source.text();
        if text.is_empty() || text.ends_with('\n') {
            return Ok(Vec::new());
        }
        let row = text.lines().count().saturating_sub(1);
        let column = text.lines().last().map(str::len).unwrap_or(0);
        Ok(vec![Diagnostic::convention(
            DiagnosticKind::FinalNewline,
            "Final newline missing.",
            self.id(),
            Span::new(Point::new(row, column), Point::new(row, column)),
        )])
    }
}

/// Rule: methods defined twice in the same scope
pub struct DuplicateMethodRule;

/// Nodes whose direct children form one method scope.
const SCOPE_KINDS: &[&str] = &["program", "body_statement"];

impl LintRule for DuplicateMethodRule {
    fn id(&self) -> &str {
        "duplicate-method"
    }

    fn description(&self) -> &str {
        "Check for methods redefined in the same class, module or file"
    }

    fn check(&self, source: &ParsedSource, _context: &LintContext) -> Result<Vec<Diagnostic>, LintError> {
        let mut diagnostics = Vec::new();
        let Some(root) = source.root_node() else {
            return Ok(diagnostics);
        };

        walk(root, |scope| {
            if !SCOPE_KINDS.contains(&scope.kind()) {
                return Visit::Descend;
            }
            let mut seen: HashMap<String, usize> = HashMap::new();
            let mut cursor = scope.walk();
            for child in scope.named_children(&mut cursor) {
                let key = match child.kind() {
                    "method" => child
                        .child_by_field_name("name")
                        .map(|name| source.node_text(&name).to_string()),
                    "singleton_method" => child.child_by_field_name("name").map(|name| {
                        let object = child
                            .child_by_field_name("object")
                            .map(|object| source.node_text(&object))
                            .unwrap_or("self");
                        format!("{}.{}", object, source.node_text(&name))
                    }),
                    _ => None,
                };
                let Some(key) = key else { continue };
                let name_span = child
                    .child_by_field_name("name")
                    .map(|name| Span::of(&name))
                    .unwrap_or_else(|| Span::of(&child));
                match seen.get(&key) {
                    Some(first_line) => diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::DuplicateMethod,
                        format!(
                            "Method `{}` is defined more than once in this scope (first defined on line {}).",
                            key,
                            first_line + 1
                        ),
                        self.id(),
                        name_span,
                    )),
                    None => {
                        seen.insert(key, name_span.start.line);
                    }
                }
            }
            Visit::Descend
        });

        Ok(diagnostics)
    }
}

/// Get all default rules
pub fn default_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(SyntaxRule),
        Box::new(LineLengthRule),
        Box::new(TrailingWhitespaceRule),
        Box::new(TabIndentationRule),
        Box::new(FinalNewlineRule),
        Box::new(DuplicateMethodRule),
    ]
}
