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

//! Ruby linting
//!
//! Style and correctness checks over a [`ruby_syntax::ParsedSource`].
//!
//! ## Quick Start
//!
//! ```rust
//! use ruby_lint::{lint, Severity};
//! use ruby_syntax::RubyParser;
//!
//! let source = RubyParser::new().unwrap().parse("def foo\n");
//! let diagnostics = lint(&source).unwrap();
//! assert!(diagnostics.iter().any(|d| d.severity() == Severity::Error));
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use ruby_lint::{lint_with_config, LintConfig, Severity};
//! use ruby_syntax::RubyParser;
//!
//! let mut config = LintConfig::default();
//! config.disable_rule("tab-indentation");
//! config.max_line_length = 80;
//! config.min_severity = Severity::Warning;
//!
//! let source = RubyParser::new().unwrap().parse("x = 1\n");
//! let diagnostics = lint_with_config(&source, config).unwrap();
//! assert!(diagnostics.is_empty());
//! ```

mod diagnostic;
mod error;
mod rules;
mod runner;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use error::LintError;
pub use rules::{
    default_rules, DuplicateMethodRule, FinalNewlineRule, LineLengthRule, LintRule, RuleConfig,
    SyntaxRule, TabIndentationRule, TrailingWhitespaceRule,
};
pub use runner::{LintConfig, LintContext, LintRunner, DEFAULT_MAX_LINE_LENGTH};

use ruby_syntax::ParsedSource;

/// Run all default lint rules on a source
pub fn lint(source: &ParsedSource) -> Result<Vec<Diagnostic>, LintError> {
    LintRunner::new(LintConfig::default()).run(source)
}

/// Run lint with custom configuration
pub fn lint_with_config(source: &ParsedSource, config: LintConfig) -> Result<Vec<Diagnostic>, LintError> {
    LintRunner::new(config).run(source)
}
