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

//! Cache of parsed documents.
//!
//! One [`SyntaxTree`] per uri, tagged with the document version it was parsed
//! from. A cached tree is only served while its version matches the document;
//! anything older is reparsed.
//!
//! # Locking
//!
//! Each uri has its own slot behind a `parking_lot::RwLock`. Serving a fresh
//! tree takes the read lock, so readers run concurrently. Parsing takes the
//! write lock, so at most one parse per uri runs at a time and later callers
//! reuse its result.

use crate::document_store::{DocumentSnapshot, DocumentStore};
use crate::error::ForestError;
use dashmap::DashMap;
use parking_lot::RwLock;
use ruby_syntax::{ParsedSource, RubyParser};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_lsp::lsp_types::Url;
use tracing::debug;

/// A parsed document at one version.
#[derive(Debug)]
pub struct SyntaxTree {
    pub uri: Url,
    pub version: i32,
    pub source: ParsedSource,
}

impl SyntaxTree {
    pub fn text(&self) -> &str {
        self.source.text()
    }
}

type Slot = Arc<RwLock<Option<Arc<SyntaxTree>>>>;

/// Counters for cache behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForestStatistics {
    pub hits: u64,
    pub parses: u64,
    pub invalidations: u64,
    pub cached: usize,
}

impl ForestStatistics {
    /// Fraction of lookups answered without parsing.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.parses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

pub struct Forest {
    documents: Arc<DocumentStore>,
    parser: RubyParser,
    trees: DashMap<Url, Slot>,
    hits: AtomicU64,
    parses: AtomicU64,
    invalidations: AtomicU64,
}

impl Forest {
    pub fn new(documents: Arc<DocumentStore>, parser: RubyParser) -> Self {
        Self {
            documents,
            parser,
            trees: DashMap::new(),
            hits: AtomicU64::new(0),
            parses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Tree for the current version of `uri`, parsing if the cache is stale.
    ///
    /// A cache hit costs a version lookup; the document text is only copied
    /// when a parse is needed.
    pub fn get(&self, uri: &Url) -> Result<Arc<SyntaxTree>, ForestError> {
        let not_open = || ForestError::DocumentNotOpen(uri.to_string());
        let version = self.documents.version(uri).ok_or_else(not_open)?;

        let slot = self.slot(uri);
        {
            let cached = slot.read();
            if let Some(tree) = cached.as_ref().filter(|tree| tree.version == version) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(tree));
            }
        }

        let tree = {
            let mut cached = slot.write();
            let Some(snapshot) = self.documents.snapshot(uri) else {
                drop(cached);
                self.trees.remove(uri);
                return Err(not_open());
            };

            // Another caller may have parsed this version, or a later one,
            // while we waited for the lock.
            if let Some(tree) = cached
                .as_ref()
                .filter(|tree| tree.version >= snapshot.version)
            {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(tree));
            }

            let tree = Arc::new(self.parse(snapshot));
            *cached = Some(Arc::clone(&tree));
            tree
        };

        if !self.documents.contains(uri) {
            self.trees.remove(uri);
        }
        Ok(tree)
    }

    fn slot(&self, uri: &Url) -> Slot {
        Arc::clone(self.trees.entry(uri.clone()).or_default().value())
    }

    fn parse(&self, snapshot: DocumentSnapshot) -> SyntaxTree {
        let source = self.parser.parse_shared(snapshot.text);
        self.parses.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Parsed {} v{} ({} syntax errors)",
            snapshot.uri,
            snapshot.version,
            source.errors().len()
        );
        SyntaxTree {
            uri: snapshot.uri,
            version: snapshot.version,
            source,
        }
    }

    /// Drop the cached tree for `uri`.
    pub fn invalidate(&self, uri: &Url) {
        if let Some(slot) = self.trees.get(uri).map(|entry| Arc::clone(entry.value())) {
            if slot.write().take().is_some() {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Forget `uri` entirely, including its slot.
    pub fn remove(&self, uri: &Url) {
        if self.trees.remove(uri).is_some() {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every cached tree. Safe to call more than once.
    pub fn release_all(&self) {
        let released = self.trees.len();
        self.trees.clear();
        if released > 0 {
            debug!("Released {} syntax trees", released);
        }
    }

    pub fn cached(&self, uri: &Url) -> Option<Arc<SyntaxTree>> {
        let slot = self.trees.get(uri).map(|entry| Arc::clone(entry.value()))?;
        let cached = slot.read();
        cached.clone()
    }

    pub fn statistics(&self) -> ForestStatistics {
        ForestStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            parses: self.parses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            cached: self
                .trees
                .iter()
                .filter(|entry| entry.value().read().is_some())
                .count(),
        }
    }
}
