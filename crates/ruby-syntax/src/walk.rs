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

//! Tree traversal helpers.

use tree_sitter::Node;

/// Whether [`walk`] should enter the children of the node just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// Pre-order traversal of `root` and its descendants, anonymous nodes included.
///
/// Uses a tree cursor rather than recursion, so deeply nested sources cannot
/// exhaust the stack.
pub fn walk<'tree, F>(root: Node<'tree>, mut visit: F)
where
    F: FnMut(Node<'tree>) -> Visit,
{
    let mut cursor = root.walk();
    'outer: loop {
        if visit(cursor.node()) == Visit::Descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'outer;
            }
            if !cursor.goto_parent() {
                break 'outer;
            }
        }
    }
}

/// Collect every named descendant of `root` (including `root`) whose kind is in `kinds`.
pub fn find_kinds<'tree>(root: Node<'tree>, kinds: &[&str]) -> Vec<Node<'tree>> {
    let mut found = Vec::new();
    walk(root, |node| {
        if node.is_named() && kinds.contains(&node.kind()) {
            found.push(node);
        }
        Visit::Descend
    });
    found
}

/// Nearest ancestor of `node` (excluding `node`) whose kind is in `kinds`.
pub fn enclosing<'tree>(node: Node<'tree>, kinds: &[&str]) -> Option<Node<'tree>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if kinds.contains(&parent.kind()) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}
