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

//! Ruby Language Server binary.
//!
//! # Usage
//!
//! ```bash
//! # Run the language server (stdio transport)
//! ruby-lsp
//!
//! # With debug logging
//! RUST_LOG=debug ruby-lsp
//! ```
//!
//! Timing and size limits can be tuned through `initializationOptions`:
//!
//! ```json
//! { "debounceMs": 200, "configurationBatchWindowMs": 50, "maxDocumentSize": 524288000 }
//! ```
//!
//! # Editor Integration
//!
//! ## Neovim (nvim-lspconfig)
//!
//! ```lua
//! require('lspconfig.configs').ruby_lsp = {
//!   default_config = {
//!     cmd = { 'ruby-lsp' },
//!     filetypes = { 'ruby' },
//!     root_dir = function() return vim.fn.getcwd() end,
//!   },
//! }
//! require('lspconfig').ruby_lsp.setup {}
//! ```

use ruby_lsp::RubyLanguageServer;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ruby_lsp=info".parse().expect("valid log directive"))
                .add_directive("tower_lsp=info".parse().expect("valid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Ruby Language Server v{}", ruby_lsp::VERSION);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(RubyLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
