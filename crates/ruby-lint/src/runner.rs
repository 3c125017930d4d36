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

//! Lint runner

use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::error::LintError;
use crate::rules::{default_rules, LintRule, RuleConfig};
use ruby_syntax::{ParsedSource, Span};
use std::collections::HashMap;

/// Maximum number of diagnostics to collect before stopping.
///
/// Most legitimate documents produce well under 100 diagnostics; the cap keeps
/// a pathological file (say, 100k lines of trailing whitespace) from flooding
/// the editor.
const MAX_DIAGNOSTICS: usize = 10_000;

/// Default maximum line length, in characters.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 120;

/// Context passed to lint rules.
#[derive(Debug, Clone)]
pub struct LintContext {
    /// Maximum line length in characters
    pub max_line_length: usize,
}

impl Default for LintContext {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Configuration for the lint runner
#[derive(Debug, Clone)]
pub struct LintConfig {
    /// Rule configurations by rule ID
    pub rules: HashMap<String, RuleConfig>,
    /// Minimum severity to report
    pub min_severity: Severity,
    /// Maximum number of diagnostics to collect (default: 10,000)
    pub max_diagnostics: usize,
    /// Maximum line length in characters (default: 120)
    pub max_line_length: usize,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            min_severity: Severity::Hint,
            max_diagnostics: MAX_DIAGNOSTICS,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl LintConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), LintError> {
        if self.max_line_length == 0 {
            return Err(LintError::InvalidConfig(
                "maximum line length must be at least 1".to_string(),
            ));
        }
        if self.max_diagnostics == 0 {
            return Err(LintError::InvalidConfig(
                "maximum diagnostics must be at least 1".to_string(),
            ));
        }
        if self.rules.keys().any(String::is_empty) {
            return Err(LintError::InvalidConfig("Empty rule ID not allowed".to_string()));
        }
        Ok(())
    }

    /// Disable a specific rule
    pub fn disable_rule(&mut self, rule_id: &str) {
        self.rules.insert(
            rule_id.to_string(),
            RuleConfig {
                enabled: false,
                error: false,
            },
        );
    }

    /// Set a rule to error level
    pub fn set_rule_error(&mut self, rule_id: &str) {
        self.rules.insert(
            rule_id.to_string(),
            RuleConfig {
                enabled: true,
                error: true,
            },
        );
    }

    fn rule_config(&self, rule_id: &str) -> RuleConfig {
        self.rules.get(rule_id).cloned().unwrap_or_default()
    }
}

/// Lint runner
pub struct LintRunner {
    config: LintConfig,
    rules: Vec<Box<dyn LintRule>>,
}

impl LintRunner {
    /// Create a new lint runner with default rules
    pub fn new(config: LintConfig) -> Self {
        Self {
            config,
            rules: default_rules(),
        }
    }

    /// Create a lint runner with custom rules
    pub fn with_rules(config: LintConfig, rules: Vec<Box<dyn LintRule>>) -> Self {
        Self { config, rules }
    }

    /// Run all enabled rules, returning diagnostics ordered by position.
    ///
    /// Once `max_diagnostics` is reached a single warning is appended and the
    /// remaining rules are skipped. A rule that fails aborts the run.
    pub fn run(&self, source: &ParsedSource) -> Result<Vec<Diagnostic>, LintError> {
        self.config.validate()?;

        let context = LintContext {
            max_line_length: self.config.max_line_length,
        };
        let mut diagnostics = Vec::new();

        for rule in &self.rules {
            let rule_config = self.config.rule_config(rule.id());
            if !rule_config.enabled {
                continue;
            }

            for mut diag in rule.check(source, &context)? {
                if rule_config.error {
                    diag.escalate_to_error();
                }
                if diag.severity() < self.config.min_severity {
                    continue;
                }
                if diagnostics.len() >= self.config.max_diagnostics {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::Custom("diagnostic-limit".to_string()),
                        format!(
                            "Diagnostic limit of {} reached; remaining issues are not reported.",
                            self.config.max_diagnostics
                        ),
                        "diagnostic-limit",
                        Span::default(),
                    ));
                    diagnostics.sort_by_key(|d| d.span().start);
                    return Ok(diagnostics);
                }
                diagnostics.push(diag);
            }
        }

        diagnostics.sort_by_key(|d| d.span().start);
        Ok(diagnostics)
    }
}

impl Default for LintRunner {
    fn default() -> Self {
        Self::new(LintConfig::default())
    }
}
