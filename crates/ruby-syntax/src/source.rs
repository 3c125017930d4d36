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

//! Parsed Ruby source: text, tree and recovered syntax errors.

use crate::error::SyntaxError;
use crate::span::{Point, Span};
use crate::walk::{walk, Visit};
use std::sync::Arc;
use tree_sitter::{Node, Tree};

/// Longest excerpt of unexpected source quoted in a syntax error message.
const MAX_EXCERPT_CHARS: usize = 32;

/// The result of parsing a Ruby document.
///
/// Parsing never fails: a document with syntax errors still produces a tree
/// in which tree-sitter has wrapped the unparseable regions, and the problems
/// are listed in [`ParsedSource::errors`].
#[derive(Debug, Clone)]
pub struct ParsedSource {
    text: Arc<str>,
    tree: Option<Tree>,
    errors: Vec<SyntaxError>,
}

impl ParsedSource {
    pub(crate) fn from_tree(text: Arc<str>, tree: Tree) -> Self {
        let errors = collect_errors(&text, tree.root_node());
        Self {
            text,
            tree: Some(tree),
            errors,
        }
    }

    /// A source for which the parser produced nothing.
    pub(crate) fn without_tree(text: Arc<str>, error: SyntaxError) -> Self {
        Self {
            text,
            tree: None,
            errors: vec![error],
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn root_node(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(Tree::root_node)
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Source text covered by `node`; empty if the node does not map to text.
    pub fn node_text(&self, node: &Node<'_>) -> &str {
        node.utf8_text(self.text.as_bytes()).unwrap_or("")
    }

    /// A single line without its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.text.lines().nth(line)
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Smallest named node spanning `point`.
    pub fn named_node_at(&self, point: Point) -> Option<Node<'_>> {
        let root = self.root_node()?;
        let point = tree_sitter::Point::from(point);
        root.named_descendant_for_point_range(point, point)
    }
}

fn collect_errors(text: &str, root: Node<'_>) -> Vec<SyntaxError> {
    let mut errors = Vec::new();
    if !root.has_error() {
        return errors;
    }

    walk(root, |node| {
        if node.is_missing() {
            errors.push(SyntaxError::missing(node.kind(), Span::of(&node)));
            return Visit::Skip;
        }
        if node.is_error() {
            let excerpt = node.utf8_text(text.as_bytes()).unwrap_or("").trim();
            let message = if excerpt.is_empty() {
                "syntax error".to_string()
            } else {
                format!("unexpected `{}`", truncate(excerpt))
            };
            errors.push(SyntaxError::unexpected(message, Span::of(&node)));
            return Visit::Skip;
        }
        if node.has_error() {
            Visit::Descend
        } else {
            Visit::Skip
        }
    });

    errors.sort_by_key(|e| e.span.start);
    errors
}

fn truncate(excerpt: &str) -> String {
    let first_line = excerpt.lines().next().unwrap_or("");
    if first_line.chars().count() > MAX_EXCERPT_CHARS || first_line.len() < excerpt.len() {
        let mut short: String = first_line.chars().take(MAX_EXCERPT_CHARS).collect();
        short.push('…');
        short
    } else {
        first_line.to_string()
    }
}
