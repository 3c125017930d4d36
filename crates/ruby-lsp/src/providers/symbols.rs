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

//! Document symbols for the outline view.
//!
//! Classes, modules, methods, singleton methods and constant assignments,
//! nested the way they are nested in the source. Clients without hierarchical
//! symbol support get the same symbols flattened by [`flatten_symbols`].

use crate::forest::SyntaxTree;
use crate::utils::LineIndex;
use ruby_syntax::{Node, ParsedSource, Span};
use tower_lsp::lsp_types::{DocumentSymbol, Location, SymbolInformation, SymbolKind, Url};

struct Extractor<'a> {
    source: &'a ParsedSource,
    index: LineIndex<'a>,
}

pub fn get_document_symbols(tree: &SyntaxTree) -> Vec<DocumentSymbol> {
    let source = &tree.source;
    let Some(root) = source.root_node() else {
        return Vec::new();
    };
    let extractor = Extractor {
        source,
        index: LineIndex::new(source.text()),
    };
    extractor.children(root)
}

impl<'a> Extractor<'a> {
    fn children(&self, node: Node<'_>) -> Vec<DocumentSymbol> {
        let mut symbols = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match self.symbol(child) {
                Some(symbol) => symbols.push(symbol),
                None => symbols.extend(self.children(child)),
            }
        }
        symbols
    }

    #[allow(deprecated)]
    fn symbol(&self, node: Node<'_>) -> Option<DocumentSymbol> {
        let (kind, name_node, name) = match node.kind() {
            "class" => {
                let name = node.child_by_field_name("name")?;
                (SymbolKind::CLASS, name, self.text(name))
            }
            "module" => {
                let name = node.child_by_field_name("name")?;
                (SymbolKind::MODULE, name, self.text(name))
            }
            "singleton_class" => {
                let value = node.child_by_field_name("value")?;
                (SymbolKind::NAMESPACE, value, format!("class << {}", self.text(value)))
            }
            "method" => {
                let name = node.child_by_field_name("name")?;
                (SymbolKind::METHOD, name, self.text(name))
            }
            "singleton_method" => {
                let object = node.child_by_field_name("object")?;
                let name = node.child_by_field_name("name")?;
                (
                    SymbolKind::METHOD,
                    name,
                    format!("{}.{}", self.text(object), self.text(name)),
                )
            }
            "assignment" => {
                let left = node.child_by_field_name("left")?;
                if left.kind() != "constant" {
                    return None;
                }
                (SymbolKind::CONSTANT, left, self.text(left))
            }
            _ => return None,
        };

        let detail = match node.kind() {
            "class" => node
                .child_by_field_name("superclass")
                .map(|superclass| self.text(superclass)),
            "method" | "singleton_method" => node
                .child_by_field_name("parameters")
                .map(|params| self.text(params)),
            _ => None,
        };

        let children = if kind == SymbolKind::CONSTANT {
            Vec::new()
        } else {
            self.children(node)
        };

        Some(DocumentSymbol {
            name,
            detail,
            kind,
            tags: None,
            deprecated: None,
            range: self.index.range(Span::of(&node)),
            selection_range: self.index.range(Span::of(&name_node)),
            children: (!children.is_empty()).then_some(children),
        })
    }

    fn text(&self, node: Node<'_>) -> String {
        self.source.node_text(&node).to_string()
    }
}

/// Flatten nested symbols, recording each parent as the container name.
#[allow(deprecated)]
pub fn flatten_symbols(uri: &Url, symbols: Vec<DocumentSymbol>) -> Vec<SymbolInformation> {
    let mut flat = Vec::new();
    let mut stack: Vec<(DocumentSymbol, Option<String>)> =
        symbols.into_iter().rev().map(|symbol| (symbol, None)).collect();

    while let Some((mut symbol, container_name)) = stack.pop() {
        if let Some(children) = symbol.children.take() {
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|child| (child, Some(symbol.name.clone()))),
            );
        }
        flat.push(SymbolInformation {
            name: symbol.name,
            kind: symbol.kind,
            tags: None,
            deprecated: None,
            location: Location {
                uri: uri.clone(),
                range: symbol.range,
            },
            container_name,
        });
    }
    flat
}
