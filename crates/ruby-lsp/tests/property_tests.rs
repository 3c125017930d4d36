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

//! Property-based tests for the document store, forest and providers.
//!
//! # Property Categories
//!
//! 1. **Edit Fidelity**: Ranged edits match a plain `String` model
//! 2. **Freshness**: The forest always answers for the current version
//! 3. **Crash Resistance**: Providers never panic on any input or position

use proptest::prelude::*;
use ruby_lsp::document_store::DocumentStore;
use ruby_lsp::forest::{Forest, SyntaxTree};
use ruby_lsp::providers::{get_document_highlights, get_document_symbols, get_folding_ranges};
use ruby_syntax::RubyParser;
use std::sync::Arc;
use tower_lsp::lsp_types::*;

fn test_uri() -> Url {
    Url::parse("file:///prop.rb").unwrap()
}

fn open(store: &DocumentStore, text: &str) {
    store
        .open(TextDocumentItem {
            uri: test_uri(),
            language_id: "ruby".to_string(),
            version: 1,
            text: text.to_string(),
        })
        .unwrap();
}

/// LSP position of a char offset in ASCII text.
fn position_of(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    Position::new(line, (offset - line_start) as u32)
}

// ============================================================================
// Property: Ranged Edits Match A String Model
// ============================================================================

proptest! {
    #[test]
    fn prop_ranged_edits_match_model(
        initial in "[a-z \n]{0,80}",
        edits in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>(), "[a-z\n]{0,6}"), 1..12)
    ) {
        let store = DocumentStore::new(1024 * 1024);
        open(&store, &initial);
        let mut model = initial.clone();

        for (version, (a, b, insert)) in edits.into_iter().enumerate() {
            let x = a.index(model.len() + 1);
            let y = b.index(model.len() + 1);
            let (start, end) = (x.min(y), x.max(y));

            let change = TextDocumentContentChangeEvent {
                range: Some(Range::new(position_of(&model, start), position_of(&model, end))),
                range_length: None,
                text: insert.clone(),
            };
            store.change(&test_uri(), &[change], version as i32 + 2).unwrap();
            model.replace_range(start..end, &insert);

            let snapshot = store.snapshot(&test_uri()).unwrap();
            prop_assert_eq!(&*snapshot.text, model.as_str());
            prop_assert_eq!(snapshot.version, version as i32 + 2);
        }
    }

    #[test]
    fn prop_rejected_batch_leaves_document_untouched(
        initial in "[a-z \n]{0,40}",
        line in 50u32..100
    ) {
        let store = DocumentStore::new(1024 * 1024);
        open(&store, &initial);

        let valid = TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(0, 0), Position::new(0, 0))),
            range_length: None,
            text: "edit".to_string(),
        };
        let invalid = TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(line, 0), Position::new(line, 1))),
            range_length: None,
            text: "x".to_string(),
        };
        prop_assert!(store.change(&test_uri(), &[valid, invalid], 2).is_err());

        let snapshot = store.snapshot(&test_uri()).unwrap();
        prop_assert_eq!(&*snapshot.text, initial.as_str());
        prop_assert_eq!(snapshot.version, 1);
    }
}

// ============================================================================
// Property: Forest Freshness
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_forest_tracks_latest_version(
        texts in prop::collection::vec("(x = [0-9]{1,3}\n|def m\nend\n|class A\n){1,4}", 1..8),
        reads in prop::collection::vec(any::<bool>(), 8)
    ) {
        let store = Arc::new(DocumentStore::new(1024 * 1024));
        let forest = Forest::new(Arc::clone(&store), RubyParser::new().unwrap());
        open(&store, "");

        for (i, text) in texts.iter().enumerate() {
            let version = i as i32 + 2;
            let change = TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.clone(),
            };
            store.change(&test_uri(), &[change], version).unwrap();
            forest.invalidate(&test_uri());

            // Skipping reads must not let an older tree win later.
            if reads[i % reads.len()] {
                let tree = forest.get(&test_uri()).unwrap();
                prop_assert_eq!(tree.version, version);
                prop_assert_eq!(tree.text(), text.as_str());
            }
        }

        let last = texts.len() as i32 + 1;
        let tree = forest.get(&test_uri()).unwrap();
        prop_assert_eq!(tree.version, last);
        prop_assert_eq!(tree.text(), texts[texts.len() - 1].as_str());
    }
}

// ============================================================================
// Property: Providers Never Panic
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_providers_never_panic(
        content in "(def |class |end|x|@y|# c|\"s\"|\t| |\n|é|😀|\\(|\\)){0,40}",
        line in 0u32..20,
        character in 0u32..40
    ) {
        let tree = SyntaxTree {
            uri: test_uri(),
            version: 1,
            source: RubyParser::new().unwrap().parse(&content),
        };

        let _ = get_document_highlights(&tree, Position::new(line, character));
        let _ = get_document_symbols(&tree);
        for range in get_folding_ranges(&tree) {
            prop_assert!(range.end_line > range.start_line);
        }
    }
}
