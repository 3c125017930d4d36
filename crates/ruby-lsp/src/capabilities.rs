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

//! Server capabilities derived from what the client advertises.

use tower_lsp::lsp_types::{
    ClientCapabilities, FoldingRangeProviderCapability, OneOf, ServerCapabilities,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    WorkspaceFoldersServerCapabilities, WorkspaceServerCapabilities,
};

/// Pure function of the client's capabilities; computed once at `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityCalculator {
    pub supports_configuration: bool,
    pub supports_workspace_folders: bool,
    pub supports_dynamic_configuration_registration: bool,
    pub supports_hierarchical_symbols: bool,
}

impl CapabilityCalculator {
    pub fn new(client: &ClientCapabilities) -> Self {
        let workspace = client.workspace.as_ref();
        let text_document = client.text_document.as_ref();

        Self {
            supports_configuration: workspace.and_then(|w| w.configuration).unwrap_or(false),
            supports_workspace_folders: workspace
                .and_then(|w| w.workspace_folders)
                .unwrap_or(false),
            supports_dynamic_configuration_registration: workspace
                .and_then(|w| w.did_change_configuration.as_ref())
                .and_then(|c| c.dynamic_registration)
                .unwrap_or(false),
            supports_hierarchical_symbols: text_document
                .and_then(|t| t.document_symbol.as_ref())
                .and_then(|s| s.hierarchical_document_symbol_support)
                .unwrap_or(false),
        }
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        let workspace = self.supports_workspace_folders.then(|| WorkspaceServerCapabilities {
            workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                supported: Some(true),
                change_notifications: Some(OneOf::Left(true)),
            }),
            file_operations: None,
        });

        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::INCREMENTAL),
                    will_save: None,
                    will_save_wait_until: None,
                    save: None,
                },
            )),
            document_highlight_provider: Some(OneOf::Left(true)),
            folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
            document_symbol_provider: Some(OneOf::Left(true)),
            document_formatting_provider: Some(OneOf::Left(true)),
            workspace,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{
        DidChangeConfigurationClientCapabilities, DocumentSymbolClientCapabilities,
        TextDocumentClientCapabilities, WorkspaceClientCapabilities,
    };

    #[test]
    fn test_bare_client() {
        let calculator = CapabilityCalculator::new(&ClientCapabilities::default());
        assert!(!calculator.supports_configuration);
        assert!(!calculator.supports_workspace_folders);
        assert!(!calculator.supports_dynamic_configuration_registration);
        assert!(!calculator.supports_hierarchical_symbols);

        let capabilities = calculator.capabilities();
        assert!(capabilities.workspace.is_none());
        assert_eq!(
            capabilities.text_document_sync,
            Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                will_save: None,
                will_save_wait_until: None,
                save: None,
            }))
        );
        assert_eq!(capabilities.document_highlight_provider, Some(OneOf::Left(true)));
        assert_eq!(capabilities.document_formatting_provider, Some(OneOf::Left(true)));
    }

    #[test]
    fn test_full_client() {
        let client = ClientCapabilities {
            workspace: Some(WorkspaceClientCapabilities {
                configuration: Some(true),
                workspace_folders: Some(true),
                did_change_configuration: Some(DidChangeConfigurationClientCapabilities {
                    dynamic_registration: Some(true),
                }),
                ..Default::default()
            }),
            text_document: Some(TextDocumentClientCapabilities {
                document_symbol: Some(DocumentSymbolClientCapabilities {
                    hierarchical_document_symbol_support: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let calculator = CapabilityCalculator::new(&client);
        assert!(calculator.supports_configuration);
        assert!(calculator.supports_workspace_folders);
        assert!(calculator.supports_dynamic_configuration_registration);
        assert!(calculator.supports_hierarchical_symbols);

        let folders = calculator
            .capabilities()
            .workspace
            .and_then(|w| w.workspace_folders)
            .unwrap();
        assert_eq!(folders.supported, Some(true));
    }
}
