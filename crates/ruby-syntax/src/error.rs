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

//! Error types for Ruby parsing.

use crate::span::Span;
use std::fmt;
use thiserror::Error;

/// Failure to set up a parser. Parsing itself never fails; see [`SyntaxError`].
#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("Parser initialization error: {0}")]
    UnableToInitialize(String),
}

/// The kind of syntax problem recovered during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// Tokens the grammar could not place.
    Unexpected,
    /// A token the parser inserted to recover, e.g. a missing `end`.
    Missing(String),
    /// The parser produced no tree at all.
    Internal,
}

impl SyntaxErrorKind {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected => write!(f, "UnexpectedSyntax"),
            Self::Missing(_) => write!(f, "MissingSyntax"),
            Self::Internal => write!(f, "ParserFailure"),
        }
    }
}

/// A syntax error recovered while parsing.
///
/// These are stored inside [`crate::ParsedSource`] rather than returned as
/// `Err`, so a malformed document still yields a usable tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn unexpected(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: SyntaxErrorKind::Unexpected,
            message: message.into(),
            span,
        }
    }

    pub fn missing(token: impl Into<String>, span: Span) -> Self {
        let token = token.into();
        Self {
            message: format!("missing `{}`", token),
            kind: SyntaxErrorKind::Missing(token),
            span,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SyntaxErrorKind::Internal,
            message: message.into(),
            span: Span::default(),
        }
    }
}
