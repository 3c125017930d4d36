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

//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use ruby_lsp::config::RubyConfiguration;
use ruby_lsp::forest::SyntaxTree;
use ruby_lsp::{ConfigurationFetcher, DiagnosticsSink, FetchError, LintEngine, RuleEngine};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::mpsc as std_mpsc;
use tokio::sync::{mpsc, oneshot};
use tower_lsp::lsp_types::{Diagnostic, TextDocumentContentChangeEvent, TextDocumentItem, Url};

// ============================================================================
// Documents
// ============================================================================

pub fn uri(name: &str) -> Url {
    Url::parse(&format!("file:///{}", name)).unwrap()
}

pub fn item(uri: &Url, version: i32, text: &str) -> TextDocumentItem {
    TextDocumentItem {
        uri: uri.clone(),
        language_id: "ruby".to_string(),
        version,
        text: text.to_string(),
    }
}

pub fn full_change(text: &str) -> Vec<TextDocumentContentChangeEvent> {
    vec![TextDocumentContentChangeEvent {
        range: None,
        range_length: None,
        text: text.to_string(),
    }]
}

// ============================================================================
// Diagnostics sink
// ============================================================================

#[derive(Debug, Clone)]
pub struct Published {
    pub uri: Url,
    pub diagnostics: Vec<Diagnostic>,
    pub version: Option<i32>,
}

/// Records every publish and streams it to the test.
pub struct RecordingSink {
    log: Mutex<Vec<Published>>,
    events: mpsc::UnboundedSender<Published>,
}

impl RecordingSink {
    pub fn new() -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<Published>) {
        let (events, rx) = mpsc::unbounded_channel();
        let sink = std::sync::Arc::new(Self {
            log: Mutex::new(Vec::new()),
            events,
        });
        (sink, rx)
    }

    pub fn published(&self) -> Vec<Published> {
        self.log.lock().clone()
    }

    pub fn versions_for(&self, uri: &Url) -> Vec<Option<i32>> {
        self.log
            .lock()
            .iter()
            .filter(|p| &p.uri == uri)
            .map(|p| p.version)
            .collect()
    }
}

#[tower_lsp::async_trait]
impl DiagnosticsSink for RecordingSink {
    async fn send_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        let published = Published {
            uri,
            diagnostics,
            version,
        };
        self.log.lock().push(published.clone());
        let _ = self.events.send(published);
    }
}

// ============================================================================
// Configuration fetchers
// ============================================================================

/// Answers `null` (defaults) for every scope.
pub struct NullFetcher;

#[tower_lsp::async_trait]
impl ConfigurationFetcher for NullFetcher {
    async fn fetch(&self, scopes: Vec<String>) -> Result<Vec<Value>, FetchError> {
        Ok(vec![Value::Null; scopes.len()])
    }
}

/// Replays queued responses; answers `null` per scope once the queue is empty.
/// A fetch can be held in flight until the test releases it.
pub struct ScriptedFetcher {
    calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<VecDeque<Result<Vec<Value>, FetchError>>>,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            hold: Mutex::new(None),
        }
    }

    pub fn respond(&self, response: Result<Vec<Value>, FetchError>) {
        self.responses.lock().push_back(response);
    }

    /// Make the next fetch wait until the returned sender fires or is dropped.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[tower_lsp::async_trait]
impl ConfigurationFetcher for ScriptedFetcher {
    async fn fetch(&self, scopes: Vec<String>) -> Result<Vec<Value>, FetchError> {
        self.calls.lock().push(scopes.clone());
        let hold = self.hold.lock().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        let response = self.responses.lock().pop_front();
        response.unwrap_or_else(|| Ok(vec![Value::Null; scopes.len()]))
    }
}

// ============================================================================
// Lint engines
// ============================================================================

/// Blocks the lint of one version until released, then lints normally.
pub struct GatedEngine {
    gated_version: i32,
    entered: Mutex<Option<std_mpsc::Sender<()>>>,
    release: Mutex<std_mpsc::Receiver<()>>,
}

pub struct Gate {
    pub entered: std_mpsc::Receiver<()>,
    pub release: std_mpsc::Sender<()>,
}

impl GatedEngine {
    pub fn new(gated_version: i32) -> (Self, Gate) {
        let (entered_tx, entered_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let engine = Self {
            gated_version,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (engine, gate)
    }
}

impl LintEngine for GatedEngine {
    fn lint(
        &self,
        tree: &SyntaxTree,
        settings: &RubyConfiguration,
    ) -> Result<Vec<ruby_lint::Diagnostic>, ruby_lint::LintError> {
        if tree.version == self.gated_version {
            if let Some(entered) = self.entered.lock().take() {
                let _ = entered.send(());
            }
            let _ = self.release.lock().recv();
        }
        RuleEngine.lint(tree, settings)
    }
}
