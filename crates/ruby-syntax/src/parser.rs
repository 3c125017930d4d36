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

//! Pooled tree-sitter parser for Ruby.

use crate::error::{ParserError, SyntaxError};
use crate::source::ParsedSource;
use parking_lot::Mutex;
use std::sync::Arc;
use tree_sitter::{Language, Parser};
use tracing::{debug, error};

/// Parsers kept around for reuse once returned to the pool.
const MAX_POOLED_PARSERS: usize = 8;

/// Ruby parser safe to share between threads.
///
/// A `tree_sitter::Parser` is single-threaded, so parsers are checked out of a
/// small pool for the duration of one parse. Concurrent parses of different
/// documents do not contend on a single parser.
pub struct RubyParser {
    language: Language,
    pool: Mutex<Vec<Parser>>,
}

impl RubyParser {
    /// Create a parser, verifying the grammar can be loaded.
    pub fn new() -> Result<Self, ParserError> {
        let language: Language = tree_sitter_ruby::LANGUAGE.into();
        let parser = Self::create(&language)?;
        Ok(Self {
            language,
            pool: Mutex::new(vec![parser]),
        })
    }

    fn create(language: &Language) -> Result<Parser, ParserError> {
        let mut parser = Parser::new();
        parser.set_language(language).map_err(|e| {
            ParserError::UnableToInitialize(format!("Unable to load the Ruby grammar: {}", e))
        })?;
        Ok(parser)
    }

    /// Parse `text`. Syntax problems are recorded in the result, never returned as `Err`.
    pub fn parse(&self, text: &str) -> ParsedSource {
        self.parse_shared(Arc::from(text))
    }

    /// Parse text the caller already holds behind an `Arc`.
    pub fn parse_shared(&self, text: Arc<str>) -> ParsedSource {
        let checked_out = self.pool.lock().pop();
        let mut parser = match checked_out {
            Some(parser) => parser,
            None => match Self::create(&self.language) {
                Ok(parser) => parser,
                Err(e) => {
                    error!("Could not create parser: {}", e);
                    return ParsedSource::without_tree(text, SyntaxError::internal(e.to_string()));
                }
            },
        };

        let tree = parser.parse(text.as_bytes(), None);

        {
            let mut pool = self.pool.lock();
            if pool.len() < MAX_POOLED_PARSERS {
                pool.push(parser);
            }
        }

        match tree {
            Some(tree) => {
                let source = ParsedSource::from_tree(text, tree);
                debug!(
                    "Parsed {} bytes with {} syntax errors",
                    source.text().len(),
                    source.errors().len()
                );
                source
            }
            None => {
                error!("Parser returned no tree for {} bytes of input", text.len());
                ParsedSource::without_tree(
                    text,
                    SyntaxError::internal("the parser did not produce a syntax tree"),
                )
            }
        }
    }
}

impl std::fmt::Debug for RubyParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RubyParser")
            .field("pooled", &self.pool.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_parse_empty() {
        let parser = RubyParser::new().unwrap();
        let source = parser.parse("");
        assert!(!source.has_errors());
        assert_eq!(source.text(), "");
    }

    #[test]
    fn test_parse_reuses_pool() {
        let parser = RubyParser::new().unwrap();
        for _ in 0..20 {
            parser.parse("puts 'hi'\n");
        }
        assert!(parser.pool.lock().len() <= MAX_POOLED_PARSERS);
        assert!(!parser.pool.lock().is_empty());
    }

    #[test]
    fn test_concurrent_parses() {
        let parser = Arc::new(RubyParser::new().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let parser = Arc::clone(&parser);
                thread::spawn(move || {
                    let source = parser.parse(&format!("def m{}\n  {}\nend\n", i, i));
                    assert!(!source.has_errors());
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }
    }
}
