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

//! Authoritative text and version of every open document.
//!
//! # Responsibilities
//!
//! - Document storage and retrieval
//! - Applying full and ranged (UTF-16) edits to a rope
//! - Rejecting changes whose version does not move forward
//! - Document size limits enforcement
//! - Emitting [`DocumentEvent`]s after each committed mutation
//!
//! # Thread Safety
//!
//! Each uri maps to a slot in a `DashMap`. A slot's sequence lock is held for
//! a whole mutation, event dispatch included, so open, change and close of one
//! uri are totally ordered and listeners see their events in commit order.
//! Different uris proceed independently. Readers only take the slot's
//! `RwLock`, so a listener may read the store while an event is dispatched,
//! but must not mutate the uri it is being notified about.
//!
//! Closing retires the slot and removes it from the map. An operation that
//! raced with the close and picked up the retired slot sees no document (or
//! retries, for `open`), never a resurrected one.

use crate::error::DocumentError;
use crate::observer::{ObserverRegistry, SubscriptionId};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use ropey::Rope;
use std::sync::Arc;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, TextDocumentItem, Url};
use tracing::{debug, warn};

/// An open document.
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    pub version: i32,
    pub language_id: String,
    pub rope: Rope,
}

/// Immutable copy of a document's state at one version.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub uri: Url,
    pub version: i32,
    pub language_id: String,
    pub text: Arc<str>,
}

/// Emitted synchronously after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    Opened { uri: Url, version: i32 },
    Changed { uri: Url, version: i32 },
    Closed { uri: Url },
}

#[derive(Default)]
struct DocumentSlot {
    /// Held by every mutation. `true` once the slot has been closed.
    retired: Mutex<bool>,
    document: RwLock<Option<Document>>,
}

pub struct DocumentStore {
    documents: DashMap<Url, Arc<DocumentSlot>>,
    listeners: ObserverRegistry<DocumentEvent>,
    max_document_size: usize,
}

impl DocumentStore {
    pub fn new(max_document_size: usize) -> Self {
        Self {
            documents: DashMap::new(),
            listeners: ObserverRegistry::new(),
            max_document_size,
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&DocumentEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn check_size(&self, uri: &Url, size: usize) -> Result<(), DocumentError> {
        if size > self.max_document_size {
            warn!(
                "Document size limit exceeded for {}: {} bytes > {} bytes maximum (rejected)",
                uri, size, self.max_document_size
            );
            return Err(DocumentError::TooLarge {
                uri: uri.to_string(),
                size,
                max: self.max_document_size,
            });
        }
        Ok(())
    }

    fn slot(&self, uri: &Url) -> Option<Arc<DocumentSlot>> {
        self.documents.get(uri).map(|entry| Arc::clone(entry.value()))
    }

    /// Register a newly opened document.
    ///
    /// Re-opening a uri that is already open replaces it only when the new
    /// version is strictly greater.
    pub fn open(&self, item: TextDocumentItem) -> Result<(), DocumentError> {
        self.check_size(&item.uri, item.text.len())?;
        let TextDocumentItem {
            uri,
            language_id,
            version,
            text,
        } = item;

        loop {
            let slot = Arc::clone(self.documents.entry(uri.clone()).or_default().value());
            let retired = slot.retired.lock();
            if *retired {
                // Closed after we looked it up; the next lookup finds a fresh slot.
                continue;
            }

            {
                let mut document = slot.document.write();
                if let Some(doc) = document.as_ref() {
                    if version <= doc.version {
                        warn!(
                            "Ignoring re-open of {} at version {} (current {})",
                            uri, version, doc.version
                        );
                        return Err(DocumentError::StaleVersion {
                            uri: uri.to_string(),
                            current: doc.version,
                            proposed: version,
                        });
                    }
                }
                *document = Some(Document {
                    uri: uri.clone(),
                    version,
                    language_id,
                    rope: Rope::from_str(&text),
                });
            }

            debug!(
                "Document opened: {} v{} ({} bytes, {} lines)",
                uri,
                version,
                text.len(),
                text.lines().count()
            );
            self.listeners.dispatch(&DocumentEvent::Opened { uri, version });
            drop(retired);
            return Ok(());
        }
    }

    /// Apply `changes` in order and move the document to `version`.
    ///
    /// The whole batch is rejected, leaving the document untouched, if the
    /// version does not increase or any ranged edit falls outside the text.
    pub fn change(
        &self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<(), DocumentError> {
        let not_open = || DocumentError::NotOpen(uri.to_string());
        let slot = self.slot(uri).ok_or_else(not_open)?;
        let _sequence = slot.retired.lock();

        let (current, mut rope) = match slot.document.read().as_ref() {
            Some(doc) => (doc.version, doc.rope.clone()),
            None => return Err(not_open()),
        };
        if version <= current {
            warn!(
                "Rejecting out-of-order change for {}: v{} <= v{}",
                uri, version, current
            );
            return Err(DocumentError::StaleVersion {
                uri: uri.to_string(),
                current,
                proposed: version,
            });
        }

        for change in changes {
            apply_change(&mut rope, change).map_err(|message| DocumentError::InvalidRange {
                uri: uri.to_string(),
                message,
            })?;
        }
        self.check_size(uri, rope.len_bytes())?;

        debug!(
            "Document changed: {} v{} -> v{} ({} edits, {} bytes)",
            uri,
            current,
            version,
            changes.len(),
            rope.len_bytes()
        );
        if let Some(doc) = slot.document.write().as_mut() {
            doc.rope = rope;
            doc.version = version;
        }

        self.listeners.dispatch(&DocumentEvent::Changed {
            uri: uri.clone(),
            version,
        });
        Ok(())
    }

    /// Remove a document. Returns `false` if it was not open.
    pub fn close(&self, uri: &Url) -> bool {
        let Some(slot) = self.slot(uri) else {
            debug!("Close for unknown document: {}", uri);
            return false;
        };
        let mut retired = slot.retired.lock();
        if slot.document.write().take().is_none() {
            debug!("Close for unknown document: {}", uri);
            return false;
        }
        *retired = true;
        self.documents
            .remove_if(uri, |_, current| Arc::ptr_eq(current, &slot));

        debug!("Document closed: {}", uri);
        self.listeners.dispatch(&DocumentEvent::Closed { uri: uri.clone() });
        true
    }

    pub fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        let slot = self.slot(uri)?;
        let document = slot.document.read();
        let doc = document.as_ref()?;
        Some(DocumentSnapshot {
            uri: doc.uri.clone(),
            version: doc.version,
            language_id: doc.language_id.clone(),
            text: Arc::from(doc.rope.to_string()),
        })
    }

    pub fn version(&self, uri: &Url) -> Option<i32> {
        let slot = self.slot(uri)?;
        let version = slot.document.read().as_ref().map(|doc| doc.version);
        version
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.version(uri).is_some()
    }

    pub fn uris(&self) -> Vec<Url> {
        let slots: Vec<_> = self
            .documents
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        slots
            .into_iter()
            .filter(|(_, slot)| slot.document.read().is_some())
            .map(|(uri, _)| uri)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.uris().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply_change(rope: &mut Rope, change: &TextDocumentContentChangeEvent) -> Result<(), String> {
    let Some(range) = change.range else {
        *rope = Rope::from_str(&change.text);
        return Ok(());
    };
    let start = position_to_char(rope, range.start)?;
    let end = position_to_char(rope, range.end)?;
    if start > end {
        return Err(format!(
            "range start {}:{} is after end {}:{}",
            range.start.line, range.start.character, range.end.line, range.end.character
        ));
    }
    rope.remove(start..end);
    rope.insert(start, &change.text);
    Ok(())
}

/// Char index of an LSP position. A character offset past the end of its
/// line clamps to the line end, as the protocol prescribes.
fn position_to_char(rope: &Rope, position: Position) -> Result<usize, String> {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        // The position just after a trailing newline names an empty last line.
        if line == rope.len_lines() && position.character == 0 {
            return Ok(rope.len_chars());
        }
        return Err(format!(
            "line {} out of bounds ({} lines)",
            position.line,
            rope.len_lines()
        ));
    }

    let line_start = rope.line_to_char(line);
    let slice = rope.line(line);
    let mut content_chars = slice.len_chars();
    if content_chars > 0 && slice.char(content_chars - 1) == '\n' {
        content_chars -= 1;
        if content_chars > 0 && slice.char(content_chars - 1) == '\r' {
            content_chars -= 1;
        }
    }
    let line_end = line_start + content_chars;

    let start_units = rope.char_to_utf16_cu(line_start);
    let end_units = rope.char_to_utf16_cu(line_end);
    let target = (start_units + position.character as usize).min(end_units);
    Ok(rope.utf16_cu_to_char(target))
}
