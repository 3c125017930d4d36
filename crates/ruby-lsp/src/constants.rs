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

//! LSP constants and magic number definitions.
//!
//! This module centralizes the tuning parameters and protocol values used
//! throughout the server. Timing values are defaults only; both can be
//! overridden through `initializationOptions` (see [`crate::config::ServerConfig`]).

// ============================================================================
// Performance Tuning
// ============================================================================

/// Debounce delay before a lint run starts (in milliseconds).
///
/// **Rationale**: 200ms batches a burst of keystrokes into a single lint run
/// while staying under the ~250ms threshold where feedback starts to feel
/// delayed.
///
/// **Trade-offs**:
/// - Lower values (50-100ms): More responsive but lint runs pile up while typing
/// - Higher values (300-500ms): Fewer runs but diagnostics visibly lag
pub const DEBOUNCE_MS: u64 = 200;

/// Window during which configuration requests are merged (in milliseconds).
///
/// **Rationale**: Opening a project restores several documents at once and
/// each one asks for its settings. 50ms is long enough to catch that burst in
/// one `workspace/configuration` round trip and short enough not to delay the
/// first diagnostics noticeably.
pub const CONFIGURATION_BATCH_WINDOW_MS: u64 = 50;

// ============================================================================
// Memory Limits
// ============================================================================

/// Bytes per megabyte (1024 * 1024).
pub const BYTES_PER_MEGABYTE: usize = 1024 * 1024;

/// Default maximum document size in bytes (500 MB).
///
/// **Rationale**: Prevents memory exhaustion from extremely large files. A
/// document is held as a rope, as shared text for the current syntax tree and
/// as the tree itself, so the effective footprint is a small multiple of this.
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 500 * BYTES_PER_MEGABYTE;

// ============================================================================
// LSP Protocol Constants
// ============================================================================

/// Configuration section requested from the client.
pub const CONFIGURATION_SECTION: &str = "ruby";

/// `source` attached to every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "ruby-lsp";

/// Diagnostic code of the synthetic diagnostic reported when linting itself fails.
pub const LINT_FAILURE_CODE: &str = "lint-failure";

/// Zero-based position start index.
pub const POSITION_ZERO: u32 = 0;

/// Language identifier for Ruby documents.
pub const RUBY_LANGUAGE_ID: &str = "ruby";
