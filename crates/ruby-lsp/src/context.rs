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

//! Server-lifetime state.
//!
//! [`ServerContext`] owns the document store, the forest, the configuration
//! cache and the linter, and wires document events into them. It is created
//! at `initialize` and torn down at shutdown; nothing here is global, so each
//! test can build its own.

use crate::config::ServerConfig;
use crate::configuration::{ConfigurationCache, ConfigurationFetcher};
use crate::document_store::{DocumentEvent, DocumentStore};
use crate::forest::Forest;
use crate::linter::{LintEngine, Linter, RuleEngine};
use crate::observer::SubscriptionId;
use parking_lot::Mutex;
use ruby_syntax::{ParserError, RubyParser};
use std::sync::Arc;
use tracing::debug;

pub struct ServerContext {
    pub documents: Arc<DocumentStore>,
    pub forest: Arc<Forest>,
    pub configuration: ConfigurationCache,
    pub linter: Linter,
    document_subscription: Mutex<Option<SubscriptionId>>,
}

impl ServerContext {
    /// Build a context that lints with the default rule set.
    pub fn new(
        config: &ServerConfig,
        fetcher: Arc<dyn ConfigurationFetcher>,
    ) -> Result<Self, ParserError> {
        Self::with_engine(config, fetcher, Arc::new(RuleEngine))
    }

    pub fn with_engine(
        config: &ServerConfig,
        fetcher: Arc<dyn ConfigurationFetcher>,
        engine: Arc<dyn LintEngine>,
    ) -> Result<Self, ParserError> {
        let documents = Arc::new(DocumentStore::new(config.max_document_size));
        let forest = Arc::new(Forest::new(Arc::clone(&documents), RubyParser::new()?));
        let configuration = ConfigurationCache::new(fetcher, config.configuration_batch_window());
        let linter = Linter::new(
            Arc::clone(&documents),
            Arc::clone(&forest),
            configuration.clone(),
            engine,
            config.debounce(),
        );

        // Forest and linter hold the store, so its listener holds them weakly.
        let weak_forest = Arc::downgrade(&forest);
        let weak_linter = linter.downgrade();
        let subscription = documents.subscribe(move |event| {
            let (Some(forest), Some(linter)) = (weak_forest.upgrade(), weak_linter.upgrade()) else {
                return;
            };
            match event {
                DocumentEvent::Opened { uri, version } | DocumentEvent::Changed { uri, version } => {
                    forest.invalidate(uri);
                    linter.schedule(uri.clone(), *version);
                }
                DocumentEvent::Closed { uri } => {
                    forest.remove(uri);
                    linter.forget(uri);
                }
            }
        });

        Ok(Self {
            documents,
            forest,
            configuration,
            linter,
            document_subscription: Mutex::new(Some(subscription)),
        })
    }

    /// Stop reacting to document events, cancel lint runs and configuration
    /// fetches, and drop every cached tree. Safe to call more than once.
    pub fn teardown(&self) {
        if let Some(subscription) = self.document_subscription.lock().take() {
            self.documents.unsubscribe(subscription);
        }
        self.linter.cancel_all();
        self.configuration.shutdown();
        self.forest.release_all();
        debug!("Server context torn down");
    }
}
