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

//! Document highlight: every occurrence of the name under the cursor.

use crate::forest::SyntaxTree;
use crate::utils::LineIndex;
use ruby_syntax::walk::find_kinds;
use ruby_syntax::{Node, Point, Span};
use tower_lsp::lsp_types::{DocumentHighlight, DocumentHighlightKind, Position};
use tracing::debug;

const NAME_KINDS: &[&str] = &[
    "identifier",
    "constant",
    "instance_variable",
    "class_variable",
    "global_variable",
];

const ASSIGNMENT_KINDS: &[&str] = &["assignment", "operator_assignment"];

/// Highlights for the name at `position`, or an empty list if the cursor is
/// not on a name.
pub fn get_document_highlights(tree: &SyntaxTree, position: Position) -> Vec<DocumentHighlight> {
    let source = &tree.source;
    let Some(root) = source.root_node() else {
        return Vec::new();
    };
    let index = LineIndex::new(source.text());
    let point = index.point(position);

    let Some(target) = name_at(tree, point) else {
        debug!("No name at {}:{} in {}", position.line, position.character, tree.uri);
        return Vec::new();
    };
    let name = source.node_text(&target);

    find_kinds(root, &[target.kind()])
        .into_iter()
        .filter(|node| source.node_text(node) == name)
        .map(|node| DocumentHighlight {
            range: index.range(Span::of(&node)),
            kind: Some(highlight_kind(&node)),
        })
        .collect()
}

/// Name node at `point`, also accepting a cursor placed just after the name.
fn name_at(tree: &SyntaxTree, point: Point) -> Option<Node<'_>> {
    let is_name = |node: &Node<'_>| NAME_KINDS.contains(&node.kind());
    let at = tree.source.named_node_at(point).filter(is_name);
    at.or_else(|| {
        let before = Point::new(point.line, point.column.checked_sub(1)?);
        tree.source.named_node_at(before).filter(is_name)
    })
}

fn highlight_kind(node: &Node<'_>) -> DocumentHighlightKind {
    let assigned = node.parent().is_some_and(|parent| {
        ASSIGNMENT_KINDS.contains(&parent.kind())
            && parent.child_by_field_name("left").as_ref() == Some(node)
    });
    if assigned {
        DocumentHighlightKind::WRITE
    } else {
        DocumentHighlightKind::READ
    }
}
