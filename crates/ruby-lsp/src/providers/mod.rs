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

//! Editor features answered from the parsed document.
//!
//! Every provider is a pure function of an [`crate::forest::SyntaxTree`] and
//! the request parameters. None of them parse or touch shared state.

mod folding;
mod formatting;
mod highlight;
mod symbols;

pub use folding::get_folding_ranges;
pub use formatting::{format_text, get_formatting_edits};
pub use highlight::get_document_highlights;
pub use symbols::{flatten_symbols, get_document_symbols};
