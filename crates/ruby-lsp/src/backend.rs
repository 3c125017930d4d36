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

//! LSP backend implementation.
//!
//! [`RubyLanguageServer`] adapts `tower-lsp` to the [`Server`] orchestrator.
//! The orchestrator is built in `initialize`, once the client's capabilities
//! and `initializationOptions` are known; requests that arrive before that
//! are answered with `None`.

use crate::config::ServerConfig;
use crate::configuration::ConfigurationFetcher;
use crate::constants::CONFIGURATION_SECTION;
use crate::error::FetchError;
use crate::server::{DiagnosticsSink, Server};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

/// Registration id for the dynamic `workspace/didChangeConfiguration` subscription.
const CONFIGURATION_REGISTRATION_ID: &str = "ruby-configuration";

#[tower_lsp::async_trait]
impl DiagnosticsSink for Client {
    async fn send_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.publish_diagnostics(uri, diagnostics, version).await;
    }
}

/// Fetches the `ruby` section through `workspace/configuration`.
pub struct ClientConfigurationFetcher {
    client: Client,
    supported: bool,
}

impl ClientConfigurationFetcher {
    pub fn new(client: Client, supported: bool) -> Self {
        Self { client, supported }
    }
}

#[tower_lsp::async_trait]
impl ConfigurationFetcher for ClientConfigurationFetcher {
    async fn fetch(&self, scopes: Vec<String>) -> std::result::Result<Vec<Value>, FetchError> {
        if !self.supported {
            debug!("Client has no workspace/configuration; using defaults for {} scopes", scopes.len());
            return Ok(vec![Value::Null; scopes.len()]);
        }

        let items = scopes
            .iter()
            .map(|scope| ConfigurationItem {
                scope_uri: Url::parse(scope).ok(),
                section: Some(CONFIGURATION_SECTION.to_string()),
            })
            .collect();
        self.client
            .configuration(items)
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

/// Ruby Language Server backend.
pub struct RubyLanguageServer {
    /// LSP client connection.
    client: Client,
    /// Built during `initialize`.
    server: OnceLock<Server>,
}

impl RubyLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            server: OnceLock::new(),
        }
    }

    fn server(&self) -> Option<&Server> {
        let server = self.server.get();
        if server.is_none() {
            warn!("Request received before initialize");
        }
        server
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for RubyLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Ruby Language Server initializing");

        let config = ServerConfig::from_initialization_options(params.initialization_options.as_ref());
        let supports_configuration = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|w| w.configuration)
            .unwrap_or(false);
        let fetcher = Arc::new(ClientConfigurationFetcher::new(
            self.client.clone(),
            supports_configuration,
        ));

        let server = Server::new(
            &params.capabilities,
            Arc::new(self.client.clone()),
            fetcher,
            config,
        )
        .map_err(|e| {
            error!("Cannot start: {}", e);
            Error::internal_error()
        })?;
        server.register_initialize_providers();
        let capabilities = server.capabilities();

        if self.server.set(server).is_err() {
            warn!("initialize received twice");
            return Err(Error::invalid_request());
        }

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "ruby-lsp".to_string(),
                version: Some(crate::VERSION.to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let Some(server) = self.server() else {
            return;
        };
        server.register_initialized_providers();

        if server.calculator().supports_dynamic_configuration_registration {
            let registration = Registration {
                id: CONFIGURATION_REGISTRATION_ID.to_string(),
                method: "workspace/didChangeConfiguration".to_string(),
                register_options: None,
            };
            if let Err(e) = self.client.register_capability(vec![registration]).await {
                warn!("Could not register for configuration changes: {}", e);
            }
        }
        info!("Ruby Language Server initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Ruby Language Server shutting down");
        if let Some(server) = self.server.get() {
            server.shutdown().await;
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(server) = self.server() else {
            return;
        };
        let item = params.text_document;
        info!(
            "Document opened: {} ({} bytes, {} lines)",
            item.uri,
            item.text.len(),
            item.text.lines().count()
        );
        if let Err(e) = server.did_open(item) {
            self.client.show_message(MessageType::ERROR, e.to_string()).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(server) = self.server() else {
            return;
        };
        let uri = &params.text_document.uri;
        debug!(
            "Document change event received for {} ({} changes)",
            uri,
            params.content_changes.len()
        );
        // Rejections are logged by the server; the client resyncs on its next open.
        let _ = server.did_change(uri, &params.content_changes, params.text_document.version);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!("Document closed: {}", params.text_document.uri);
        if let Some(server) = self.server() {
            server.did_close(&params.text_document.uri);
        }
    }

    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        if let Some(server) = self.server() {
            server.did_change_configuration();
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        if let Some(server) = self.server() {
            let added: Vec<Url> = params.event.added.into_iter().map(|f| f.uri).collect();
            let removed: Vec<Url> = params.event.removed.into_iter().map(|f| f.uri).collect();
            server.did_change_workspace_folders(&added, &removed);
        }
    }

    async fn document_highlight(
        &self,
        params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        let position = params.text_document_position_params;
        Ok(self
            .server()
            .and_then(|server| server.document_highlight(&position.text_document.uri, position.position)))
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> Result<Option<Vec<FoldingRange>>> {
        Ok(self
            .server()
            .and_then(|server| server.folding_range(&params.text_document.uri)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        Ok(self
            .server()
            .and_then(|server| server.document_symbol(&params.text_document.uri)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = &params.text_document.uri;
        debug!("Document formatting request for: {}", uri);
        match self.server() {
            Some(server) => Ok(server.formatting(uri).await),
            None => Ok(None),
        }
    }
}
