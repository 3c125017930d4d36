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

//! Ruby Language Server Protocol (LSP) Implementation
//!
//! This crate provides Ruby editing support through the Language Server
//! Protocol for any LSP-compatible editor.
//!
//! # Features
//!
//! - **Diagnostics**: Syntax errors and lint findings, pushed as documents change
//! - **Document Highlight**: Every occurrence of the name under the cursor
//! - **Folding Ranges**: Classes, methods, blocks, literals and comment blocks
//! - **Document Symbols**: Outline of classes, modules, methods and constants
//! - **Document Formatting**: Whitespace normalization
//!
//! # Architecture
//!
//! Everything with server lifetime lives in a [`ServerContext`]:
//!
//! - [`document_store`]: authoritative text and version of each open document
//! - [`forest`]: syntax trees, reparsed only when the document version moves
//! - [`linter`]: debounced lint runs; superseded runs are never delivered
//! - [`configuration`]: per-scope settings, fetched from the client in batches
//!
//! [`server::Server`] wires the context to the client through the
//! [`server::DiagnosticsSink`] and [`configuration::ConfigurationFetcher`]
//! seams; `RubyLanguageServer` adapts it to `tower-lsp`.
//!
//! # Usage
//!
//! ```bash
//! # Run the language server (stdio transport)
//! ruby-lsp
//!
//! # With debug logging
//! RUST_LOG=ruby_lsp=debug ruby-lsp
//! ```
//!
//! ```no_run
//! use ruby_lsp::RubyLanguageServer;
//! use tower_lsp::{LspService, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let stdin = tokio::io::stdin();
//!     let stdout = tokio::io::stdout();
//!
//!     let (service, socket) = LspService::new(RubyLanguageServer::new);
//!     Server::new(stdin, stdout, socket).serve(service).await;
//! }
//! ```

mod backend;
pub mod capabilities;
pub mod config;
pub mod configuration;
pub mod constants;
pub mod context;
pub mod document_store;
pub mod error;
pub mod forest;
pub mod linter;
pub mod observer;
pub mod providers;
pub mod server;
pub mod utils;

pub use backend::{ClientConfigurationFetcher, RubyLanguageServer};
pub use capabilities::CapabilityCalculator;
pub use config::{RubyConfiguration, ServerConfig};
pub use configuration::{ConfigurationCache, ConfigurationFetcher};
pub use context::ServerContext;
pub use document_store::{DocumentEvent, DocumentSnapshot, DocumentStore};
pub use error::{DocumentError, FetchError, ForestError};
pub use forest::{Forest, ForestStatistics, SyntaxTree};
pub use linter::{LintEngine, LintResult, Linter, RuleEngine};
pub use server::DiagnosticsSink;

/// LSP server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
