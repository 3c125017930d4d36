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

//! Server and per-scope settings.
//!
//! [`ServerConfig`] is read once from `initializationOptions`. [`RubyConfiguration`]
//! is the `ruby` settings section, fetched per scope through
//! [`crate::configuration::ConfigurationCache`].

use crate::constants::{CONFIGURATION_BATCH_WINDOW_MS, DEBOUNCE_MS, DEFAULT_MAX_DOCUMENT_SIZE};
use ruby_lint::{LintConfig, DEFAULT_MAX_LINE_LENGTH};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Process-wide settings supplied with the `initialize` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Debounce before a lint run, in milliseconds.
    pub debounce_ms: u64,
    /// Window for merging configuration requests, in milliseconds.
    pub configuration_batch_window_ms: u64,
    /// Largest document accepted, in bytes.
    pub max_document_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            configuration_batch_window_ms: CONFIGURATION_BATCH_WINDOW_MS,
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read `initializationOptions`, falling back to defaults for anything
    /// missing or malformed.
    pub fn from_initialization_options(options: Option<&Value>) -> Self {
        match options {
            None | Some(Value::Null) => Self::default(),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring malformed initializationOptions: {}", e);
                    Self::default()
                }
            },
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn configuration_batch_window(&self) -> Duration {
        Duration::from_millis(self.configuration_batch_window_ms)
    }
}

/// The `ruby` configuration section for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RubyConfiguration {
    /// Shorthand for `lint.lineLength`; wins when both are set.
    pub line_length: Option<usize>,
    pub lint: LintSettings,
    pub format: FormatSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintSettings {
    pub enabled: bool,
    pub line_length: usize,
    pub trailing_whitespace: bool,
    pub tab_indentation: bool,
    pub final_newline: bool,
    pub duplicate_method: bool,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            line_length: DEFAULT_MAX_LINE_LENGTH,
            trailing_whitespace: true,
            tab_indentation: true,
            final_newline: true,
            duplicate_method: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatSettings {
    pub enabled: bool,
    pub indent_width: usize,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            indent_width: 2,
        }
    }
}

impl RubyConfiguration {
    /// Deserialize one entry of a `workspace/configuration` response.
    ///
    /// `null` means the client has nothing configured for the scope.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            value => serde_json::from_value(value),
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.line_length.unwrap_or(self.lint.line_length)
    }

    /// Lint runner configuration derived from these settings.
    pub fn lint_config(&self) -> LintConfig {
        let mut config = LintConfig {
            max_line_length: self.max_line_length(),
            ..LintConfig::default()
        };
        let toggles = [
            ("trailing-whitespace", self.lint.trailing_whitespace),
            ("tab-indentation", self.lint.tab_indentation),
            ("final-newline", self.lint.final_newline),
            ("duplicate-method", self.lint.duplicate_method),
        ];
        for (rule_id, enabled) in toggles {
            if !enabled {
                config.disable_rule(rule_id);
            }
        }
        config
    }
}
