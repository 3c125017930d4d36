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

//! Error types for the document state subsystem.

use thiserror::Error;

/// Rejected document lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document {0} is not open")]
    NotOpen(String),

    #[error("stale version for {uri}: proposed {proposed}, current {current}")]
    StaleVersion {
        uri: String,
        current: i32,
        proposed: i32,
    },

    #[error("invalid edit range for {uri}: {message}")]
    InvalidRange { uri: String, message: String },

    #[error("document {uri} too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { uri: String, size: usize, max: usize },
}

/// Failure to produce a syntax tree.
///
/// Malformed source is not an error: it yields a tree carrying syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
    #[error("document {0} is not open")]
    DocumentNotOpen(String),
}

/// Failed configuration round trip.
///
/// `Clone` because one failed batch is reported to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("configuration request failed: {0}")]
    Transport(String),

    #[error("configuration response has {actual} items for {expected} requested scopes")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid settings for {scope}: {message}")]
    InvalidSettings { scope: String, message: String },

    #[error("configuration request cancelled")]
    Cancelled,
}
