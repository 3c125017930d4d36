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

//! Ruby parsing for the Ruby language server.
//!
//! Wraps the tree-sitter Ruby grammar behind an error-recovering API:
//! [`RubyParser::parse`] always returns a [`ParsedSource`]. Malformed input
//! yields a partial tree plus a list of [`SyntaxError`]s instead of an `Err`,
//! so every editor feature can keep working on a document mid-edit.
//!
//! ```rust
//! use ruby_syntax::RubyParser;
//!
//! let parser = RubyParser::new().expect("grammar loads");
//! let source = parser.parse("def foo");
//! assert!(source.has_errors());
//! assert!(source.tree().is_some());
//! ```

mod error;
mod parser;
mod source;
mod span;
pub mod walk;

pub use error::{ParserError, SyntaxError, SyntaxErrorKind};
pub use parser::RubyParser;
pub use source::ParsedSource;
pub use span::{Point, Span};

pub use tree_sitter::Node;
