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

//! The server orchestrator.
//!
//! [`Server`] owns a [`ServerContext`], forwards lint results to the client
//! and routes editor requests to the providers. It knows nothing about the
//! transport: diagnostics leave through a [`DiagnosticsSink`] and settings
//! arrive through a [`ConfigurationFetcher`], so the whole pipeline can be
//! driven from tests without a client.

use crate::capabilities::CapabilityCalculator;
use crate::config::{RubyConfiguration, ServerConfig};
use crate::configuration::ConfigurationFetcher;
use crate::context::ServerContext;
use crate::error::DocumentError;
use crate::forest::SyntaxTree;
use crate::linter::{LintEngine, LintResult, RuleEngine};
use crate::observer::SubscriptionId;
use crate::providers;
use parking_lot::{Mutex, RwLock};
use ruby_syntax::ParserError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::{
    ClientCapabilities, Diagnostic, DocumentHighlight, DocumentSymbolResponse, FoldingRange,
    Position, ServerCapabilities, TextDocumentContentChangeEvent, TextDocumentItem, TextEdit, Url,
};
use tracing::{debug, info, warn};

/// Destination for published diagnostics.
#[tower_lsp::async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn send_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

/// One `publishDiagnostics` notification waiting to be sent.
#[derive(Debug)]
struct Publish {
    uri: Url,
    diagnostics: Vec<Diagnostic>,
    version: Option<i32>,
}

/// Which feature handlers are live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Providers {
    pub highlight: bool,
    pub folding: bool,
    pub symbols: bool,
    pub formatting: bool,
    pub configuration: bool,
    pub workspace_folders: bool,
}

pub struct Server {
    context: ServerContext,
    calculator: CapabilityCalculator,
    config: ServerConfig,
    publisher: mpsc::UnboundedSender<Publish>,
    providers: RwLock<Providers>,
    lint_subscription: Mutex<Option<SubscriptionId>>,
    forwarder: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl Server {
    /// Must be called inside a Tokio runtime: it spawns the diagnostics forwarder.
    pub fn new(
        client_capabilities: &ClientCapabilities,
        sink: Arc<dyn DiagnosticsSink>,
        fetcher: Arc<dyn ConfigurationFetcher>,
        config: ServerConfig,
    ) -> Result<Self, ParserError> {
        Self::with_engine(client_capabilities, sink, fetcher, config, Arc::new(RuleEngine))
    }

    pub fn with_engine(
        client_capabilities: &ClientCapabilities,
        sink: Arc<dyn DiagnosticsSink>,
        fetcher: Arc<dyn ConfigurationFetcher>,
        config: ServerConfig,
        engine: Arc<dyn LintEngine>,
    ) -> Result<Self, ParserError> {
        let context = ServerContext::with_engine(&config, fetcher, engine)?;
        let calculator = CapabilityCalculator::new(client_capabilities);

        // Lint results and close-time clears share one queue so they reach the
        // client in the order they were produced.
        let (publisher, rx) = mpsc::unbounded_channel::<Publish>();
        let lint_publisher = publisher.clone();
        let lint_subscription = context.linter.subscribe(move |result: &LintResult| {
            let _ = lint_publisher.send(Publish {
                uri: result.uri.clone(),
                diagnostics: result.diagnostics.clone(),
                version: Some(result.version),
            });
        });
        let forwarder = tokio::spawn(forward_diagnostics(rx, sink));

        info!(
            "Ruby server created (debounce {}ms, configuration window {}ms)",
            config.debounce_ms, config.configuration_batch_window_ms
        );
        Ok(Self {
            context,
            calculator,
            config,
            publisher,
            providers: RwLock::new(Providers::default()),
            lint_subscription: Mutex::new(Some(lint_subscription)),
            forwarder: tokio::sync::Mutex::new(Some(forwarder)),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        self.calculator.capabilities()
    }

    pub fn calculator(&self) -> &CapabilityCalculator {
        &self.calculator
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn providers(&self) -> Providers {
        *self.providers.read()
    }

    /// Handlers advertised in the `initialize` response.
    pub fn register_initialize_providers(&self) {
        let mut providers = self.providers.write();
        providers.highlight = true;
        providers.folding = true;
        providers.symbols = true;
        providers.formatting = true;
        debug!("Registered document providers");
    }

    /// Handlers that need the client to be initialized.
    pub fn register_initialized_providers(&self) {
        let mut providers = self.providers.write();
        providers.configuration = true;
        providers.workspace_folders = self.calculator.supports_workspace_folders;
        debug!(
            "Registered workspace providers (workspace folders: {})",
            providers.workspace_folders
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Document lifecycle
    // ========================================================================

    pub fn did_open(&self, item: TextDocumentItem) -> Result<(), DocumentError> {
        let uri = item.uri.clone();
        self.context.documents.open(item).map_err(|e| {
            warn!("Rejected open of {}: {}", uri, e);
            e
        })
    }

    pub fn did_change(
        &self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<(), DocumentError> {
        self.context
            .documents
            .change(uri, changes, version)
            .map_err(|e| {
                warn!("Rejected change of {}: {}", uri, e);
                e
            })
    }

    /// Close a document and clear its diagnostics.
    pub fn did_close(&self, uri: &Url) {
        if self.context.documents.close(uri) && !self.is_shut_down() {
            let _ = self.publisher.send(Publish {
                uri: uri.clone(),
                diagnostics: Vec::new(),
                version: None,
            });
        }
    }

    /// Settings changed on the client: drop cached settings and lint again.
    pub fn did_change_configuration(&self) {
        if !self.providers().configuration {
            return;
        }
        info!("Configuration changed, re-linting open documents");
        self.context.configuration.invalidate_all();
        self.context.linter.relint_all();
    }

    pub fn did_change_workspace_folders(&self, added: &[Url], removed: &[Url]) {
        if !self.providers().workspace_folders {
            return;
        }
        info!(
            "Workspace folders changed ({} added, {} removed)",
            added.len(),
            removed.len()
        );
        self.context.configuration.invalidate_all();
        self.context.linter.relint_all();
    }

    // ========================================================================
    // Feature requests
    // ========================================================================

    fn tree(&self, uri: &Url) -> Option<Arc<SyntaxTree>> {
        match self.context.forest.get(uri) {
            Ok(tree) => Some(tree),
            Err(e) => {
                debug!("No syntax tree for request: {}", e);
                None
            }
        }
    }

    pub fn document_highlight(&self, uri: &Url, position: Position) -> Option<Vec<DocumentHighlight>> {
        if !self.providers().highlight {
            return None;
        }
        let tree = self.tree(uri)?;
        Some(providers::get_document_highlights(&tree, position))
    }

    pub fn folding_range(&self, uri: &Url) -> Option<Vec<FoldingRange>> {
        if !self.providers().folding {
            return None;
        }
        let tree = self.tree(uri)?;
        Some(providers::get_folding_ranges(&tree))
    }

    pub fn document_symbol(&self, uri: &Url) -> Option<DocumentSymbolResponse> {
        if !self.providers().symbols {
            return None;
        }
        let tree = self.tree(uri)?;
        let symbols = providers::get_document_symbols(&tree);
        if self.calculator.supports_hierarchical_symbols {
            Some(DocumentSymbolResponse::Nested(symbols))
        } else {
            Some(DocumentSymbolResponse::Flat(providers::flatten_symbols(uri, symbols)))
        }
    }

    pub async fn formatting(&self, uri: &Url) -> Option<Vec<TextEdit>> {
        if !self.providers().formatting {
            return None;
        }
        let settings = match self.context.configuration.get(uri.as_str()).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Formatting {} with default settings: {}", uri, e);
                Arc::new(RubyConfiguration::default())
            }
        };
        let tree = self.tree(uri)?;
        providers::get_formatting_edits(&tree, &settings.format)
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stop publishing diagnostics and release every cache.
    ///
    /// When this returns no further diagnostics reach the sink. Calling it
    /// again is a no-op.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already performed");
            return;
        }
        info!("Ruby server shutting down");

        if let Some(subscription) = self.lint_subscription.lock().take() {
            self.context.linter.unsubscribe(subscription);
        }
        if let Some(forwarder) = self.forwarder.lock().await.take() {
            forwarder.abort();
            let _ = forwarder.await;
        }
        self.context.teardown();
    }
}

async fn forward_diagnostics(mut rx: mpsc::UnboundedReceiver<Publish>, sink: Arc<dyn DiagnosticsSink>) {
    while let Some(publish) = rx.recv().await {
        debug!(
            "Publishing {} diagnostics for {} ({:?})",
            publish.diagnostics.len(),
            publish.uri,
            publish.version
        );
        sink.send_diagnostics(publish.uri, publish.diagnostics, publish.version)
            .await;
    }
}
