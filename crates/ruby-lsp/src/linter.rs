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

//! Debounced diagnostics pipeline.
//!
//! [`Linter::schedule`] starts a run for one document version. Each run waits
//! out the debounce, resolves the lint settings for the document, then parses
//! and lints on the blocking pool. Scheduling again for the same uri cancels
//! the previous run, and a run that lost the race is never delivered: every
//! run carries the generation it was scheduled under and delivery re-checks it
//! under the per-uri lock.
//!
//! Delivered versions never decrease for a given uri.

use crate::config::RubyConfiguration;
use crate::configuration::ConfigurationCache;
use crate::constants::{DIAGNOSTIC_SOURCE, LINT_FAILURE_CODE, POSITION_ZERO};
use crate::document_store::DocumentStore;
use crate::error::ForestError;
use crate::forest::{Forest, SyntaxTree};
use crate::observer::{ObserverRegistry, SubscriptionId};
use crate::utils::LineIndex;
use dashmap::DashMap;
use parking_lot::Mutex;
use ruby_lint::{LintError, LintRunner, Severity};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range, Url,
};
use tracing::{debug, error, warn};

/// Produces lint diagnostics for one parsed document.
pub trait LintEngine: Send + Sync {
    fn lint(
        &self,
        tree: &SyntaxTree,
        settings: &RubyConfiguration,
    ) -> Result<Vec<ruby_lint::Diagnostic>, LintError>;
}

/// Runs the `ruby_lint` rule set configured from the `ruby.lint` settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl LintEngine for RuleEngine {
    fn lint(
        &self,
        tree: &SyntaxTree,
        settings: &RubyConfiguration,
    ) -> Result<Vec<ruby_lint::Diagnostic>, LintError> {
        if !settings.lint.enabled {
            return Ok(Vec::new());
        }
        LintRunner::new(settings.lint_config()).run(&tree.source)
    }
}

/// Diagnostics for one document version.
#[derive(Debug, Clone, PartialEq)]
pub struct LintResult {
    pub uri: Url,
    pub version: i32,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintResult {
    /// A result reporting that linting itself failed.
    pub fn failure(uri: Url, version: i32, message: impl std::fmt::Display) -> Self {
        let diagnostic = Diagnostic {
            range: Range {
                start: Position::new(POSITION_ZERO, POSITION_ZERO),
                end: Position::new(POSITION_ZERO, POSITION_ZERO),
            },
            severity: Some(DiagnosticSeverity::ERROR),
            code: Some(NumberOrString::String(LINT_FAILURE_CODE.to_string())),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: format!("Linting failed: {}", message),
            ..Default::default()
        };
        Self {
            uri,
            version,
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_failure(&self) -> bool {
        self.diagnostics.iter().any(|d| {
            d.code == Some(NumberOrString::String(LINT_FAILURE_CODE.to_string()))
        })
    }
}

/// Convert lint diagnostics to protocol diagnostics against `text`.
pub fn to_lsp_diagnostics(text: &str, diagnostics: &[ruby_lint::Diagnostic]) -> Vec<Diagnostic> {
    let index = LineIndex::new(text);
    diagnostics
        .iter()
        .map(|diag| {
            let message = match diag.suggestion() {
                Some(suggestion) => format!("{} ({})", diag.message(), suggestion),
                None => diag.message().to_string(),
            };
            Diagnostic {
                range: index.range(diag.span()),
                severity: Some(lsp_severity(diag.severity())),
                code: Some(NumberOrString::String(diag.rule_id().to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message,
                ..Default::default()
            }
        })
        .collect()
}

fn lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Convention => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

#[derive(Default)]
struct RunState {
    generation: u64,
    scheduled: Option<i32>,
    delivered: Option<i32>,
    token: Option<CancellationToken>,
}

/// Per-uri run bookkeeping.
///
/// `delivery` is held from the delivery check through observer dispatch, so
/// results reach observers in the order they passed the check. Observers run
/// without `state` locked and may call back into the linter.
#[derive(Default)]
struct RunSlot {
    state: Mutex<RunState>,
    delivery: Mutex<()>,
}

type SharedRunState = Arc<RunSlot>;

struct LinterInner {
    documents: Arc<DocumentStore>,
    forest: Arc<Forest>,
    configuration: ConfigurationCache,
    engine: Arc<dyn LintEngine>,
    debounce: Duration,
    shutdown: CancellationToken,
    observers: ObserverRegistry<LintResult>,
    runs: DashMap<Url, SharedRunState>,
}

/// Cheap to clone; clones share the same pipeline.
#[derive(Clone)]
pub struct Linter {
    inner: Arc<LinterInner>,
}

/// Non-owning handle to a [`Linter`], for listeners owned by components the
/// linter itself holds.
#[derive(Clone)]
pub struct WeakLinter(Weak<LinterInner>);

impl WeakLinter {
    pub fn upgrade(&self) -> Option<Linter> {
        self.0.upgrade().map(|inner| Linter { inner })
    }
}

impl Linter {
    pub fn new(
        documents: Arc<DocumentStore>,
        forest: Arc<Forest>,
        configuration: ConfigurationCache,
        engine: Arc<dyn LintEngine>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(LinterInner {
                documents,
                forest,
                configuration,
                engine,
                debounce,
                shutdown: CancellationToken::new(),
                observers: ObserverRegistry::new(),
                runs: DashMap::new(),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakLinter {
        WeakLinter(Arc::downgrade(&self.inner))
    }

    /// Register an observer for delivered results.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&LintResult) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    /// Lint `uri` at `version` once the debounce elapses, superseding any
    /// pending or running lint of the same uri. Versions older than one
    /// already scheduled are ignored.
    pub fn schedule(&self, uri: Url, version: i32) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        let state = Arc::clone(self.inner.runs.entry(uri.clone()).or_default().value());
        let (generation, token) = {
            let mut run = state.state.lock();
            if run.scheduled.is_some_and(|scheduled| version < scheduled) {
                debug!("Ignoring lint of {} v{}: a newer version is scheduled", uri, version);
                return;
            }
            if let Some(previous) = run.token.take() {
                previous.cancel();
            }
            run.generation += 1;
            run.scheduled = Some(version);
            let token = self.inner.shutdown.child_token();
            run.token = Some(token.clone());
            (run.generation, token)
        };

        debug!("Scheduled lint of {} v{} (generation {})", uri, version, generation);
        tokio::spawn(LinterInner::run(
            Arc::clone(&self.inner),
            uri,
            version,
            generation,
            token,
            state,
        ));
    }

    /// Schedule every open document again at its current version.
    pub fn relint_all(&self) {
        for uri in self.inner.documents.uris() {
            if let Some(version) = self.inner.documents.version(&uri) {
                self.schedule(uri, version);
            }
        }
    }

    /// Cancel any run for `uri` and drop its state.
    pub fn forget(&self, uri: &Url) {
        if let Some((_, state)) = self.inner.runs.remove(uri) {
            if let Some(token) = state.state.lock().token.take() {
                token.cancel();
            }
        }
    }

    /// Cancel every run. Nothing is scheduled or delivered afterwards.
    pub fn cancel_all(&self) {
        self.inner.shutdown.cancel();
        self.inner.runs.clear();
    }

    /// Version of the last result delivered for `uri`.
    pub fn last_delivered(&self, uri: &Url) -> Option<i32> {
        let state = self.inner.runs.get(uri).map(|entry| Arc::clone(entry.value()))?;
        let delivered = state.state.lock().delivered;
        delivered
    }
}

impl LinterInner {
    async fn run(
        self: Arc<Self>,
        uri: Url,
        version: i32,
        generation: u64,
        token: CancellationToken,
        state: SharedRunState,
    ) {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Lint of {} v{} superseded during debounce", uri, version);
                return;
            }
            _ = tokio::time::sleep(self.debounce) => {}
        }

        let settings = tokio::select! {
            _ = token.cancelled() => return,
            settings = self.configuration.get(uri.as_str()) => match settings {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Using default lint settings for {}: {}", uri, e);
                    Arc::new(RubyConfiguration::default())
                }
            },
        };
        if token.is_cancelled() {
            return;
        }

        let forest = Arc::clone(&self.forest);
        let engine = Arc::clone(&self.engine);
        let task_uri = uri.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let tree = forest.get(&task_uri)?;
            let diagnostics = engine.lint(&tree, &settings);
            Ok::<_, ForestError>((tree, diagnostics))
        })
        .await;

        let result = match outcome {
            Ok(Ok((tree, _))) if tree.version != version => {
                debug!("Dropping lint of {} v{}: document is at v{}", uri, version, tree.version);
                return;
            }
            Ok(Ok((tree, Ok(diagnostics)))) => LintResult {
                diagnostics: to_lsp_diagnostics(tree.text(), &diagnostics),
                uri,
                version,
            },
            Ok(Ok((_, Err(e)))) => {
                error!("Lint of {} v{} failed: {}", uri, version, e);
                LintResult::failure(uri, version, e)
            }
            Ok(Err(e)) => {
                debug!("Dropping lint of {} v{}: {}", uri, version, e);
                return;
            }
            Err(e) => {
                error!("Lint of {} v{} panicked: {}", uri, version, e);
                LintResult::failure(uri, version, "internal error in lint task")
            }
        };

        self.deliver(&state, generation, &token, result);
    }

    fn deliver(
        &self,
        slot: &RunSlot,
        generation: u64,
        token: &CancellationToken,
        result: LintResult,
    ) {
        let _delivery = slot.delivery.lock();
        {
            let mut run = slot.state.lock();
            if run.generation != generation || token.is_cancelled() {
                debug!("Discarding superseded lint of {} v{}", result.uri, result.version);
                return;
            }
            if let Some(delivered) = run.delivered.filter(|delivered| result.version < *delivered) {
                debug!(
                    "Discarding lint of {} v{} older than delivered v{}",
                    result.uri, result.version, delivered
                );
                return;
            }
            run.delivered = Some(result.version);
            run.token = None;
        }

        debug!(
            "Delivering {} diagnostics for {} v{}",
            result.diagnostics.len(),
            result.uri,
            result.version
        );
        self.observers.dispatch(&result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::configuration::ConfigurationFetcher;
    use ruby_syntax::RubyParser;
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tower_lsp::lsp_types::TextDocumentItem;

    struct NullFetcher;

    #[tower_lsp::async_trait]
    impl ConfigurationFetcher for NullFetcher {
        async fn fetch(&self, scopes: Vec<String>) -> Result<Vec<Value>, FetchError> {
            Ok(vec![Value::Null; scopes.len()])
        }
    }

    struct FailingEngine;

    impl LintEngine for FailingEngine {
        fn lint(
            &self,
            _tree: &SyntaxTree,
            _settings: &RubyConfiguration,
        ) -> Result<Vec<ruby_lint::Diagnostic>, LintError> {
            Err(LintError::Rule {
                rule_id: "broken".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    struct PanickingEngine;

    impl LintEngine for PanickingEngine {
        fn lint(
            &self,
            _tree: &SyntaxTree,
            _settings: &RubyConfiguration,
        ) -> Result<Vec<ruby_lint::Diagnostic>, LintError> {
            panic!("engine exploded")
        }
    }

    fn uri() -> Url {
        Url::parse("file:///lint.rb").unwrap()
    }

    fn setup(
        engine: Arc<dyn LintEngine>,
    ) -> (Arc<DocumentStore>, Linter, mpsc::UnboundedReceiver<LintResult>) {
        let store = Arc::new(DocumentStore::new(1024 * 1024));
        let forest = Arc::new(Forest::new(Arc::clone(&store), RubyParser::new().unwrap()));
        let configuration =
            ConfigurationCache::new(Arc::new(NullFetcher), Duration::from_millis(10));
        let linter = Linter::new(
            Arc::clone(&store),
            forest,
            configuration,
            engine,
            Duration::from_millis(100),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        linter.subscribe(move |result| {
            let _ = tx.send(result.clone());
        });
        (store, linter, rx)
    }

    fn open(store: &DocumentStore, text: &str) {
        store
            .open(TextDocumentItem {
                uri: uri(),
                language_id: "ruby".to_string(),
                version: 1,
                text: text.to_string(),
            })
            .unwrap();
    }

    #[test]
    fn test_rule_engine_respects_enabled_flag() {
        let tree = SyntaxTree {
            uri: uri(),
            version: 1,
            source: RubyParser::new().unwrap().parse("def foo"),
        };
        let mut settings = RubyConfiguration::default();
        assert!(!RuleEngine.lint(&tree, &settings).unwrap().is_empty());
        settings.lint.enabled = false;
        assert!(RuleEngine.lint(&tree, &settings).unwrap().is_empty());
    }

    #[test]
    fn test_to_lsp_diagnostics_uses_utf16_columns() {
        let source = RubyParser::new().unwrap().parse("x = '😀'   \n");
        let diagnostics = ruby_lint::lint(&source).unwrap();
        let converted = to_lsp_diagnostics(source.text(), &diagnostics);
        let trailing = converted
            .iter()
            .find(|d| d.code == Some(NumberOrString::String("trailing-whitespace".to_string())))
            .unwrap();
        assert_eq!(trailing.range.start, Position::new(0, 8));
        assert_eq!(trailing.range.end, Position::new(0, 11));
        assert_eq!(trailing.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_after_debounce() {
        let (store, linter, mut rx) = setup(Arc::new(RuleEngine));
        open(&store, "def foo\nend\n");
        linter.schedule(uri(), 1);

        let result = rx.recv().await.unwrap();
        assert_eq!(result.version, 1);
        assert!(result.diagnostics.is_empty());
        assert_eq!(linter.last_delivered(&uri()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lint_error_becomes_failure_diagnostic() {
        let (store, linter, mut rx) = setup(Arc::new(FailingEngine));
        open(&store, "x = 1\n");
        linter.schedule(uri(), 1);

        let result = rx.recv().await.unwrap();
        assert!(result.is_failure());
        assert_eq!(result.version, 1);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_isolated() {
        let (store, linter, mut rx) = setup(Arc::new(PanickingEngine));
        open(&store, "x = 1\n");
        linter.schedule(uri(), 1);

        let result = rx.recv().await.unwrap();
        assert!(result.is_failure());
        assert_eq!(result.uri, uri());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_cancels_pending_run() {
        let (store, linter, mut rx) = setup(Arc::new(RuleEngine));
        open(&store, "x = 1\n");
        linter.schedule(uri(), 1);
        linter.forget(&uri());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_schedule_is_ignored() {
        let (store, linter, mut rx) = setup(Arc::new(RuleEngine));
        open(&store, "x = 1\n");
        linter.schedule(uri(), 1);
        linter.schedule(uri(), 0);

        let result = rx.recv().await.unwrap();
        assert_eq!(result.version, 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_scheduling() {
        let (store, linter, mut rx) = setup(Arc::new(RuleEngine));
        open(&store, "x = 1\n");
        linter.schedule(uri(), 1);
        linter.cancel_all();
        linter.schedule(uri(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_may_call_back_into_linter() {
        let (store, linter, mut rx) = setup(Arc::new(RuleEngine));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let relinted = std::sync::atomic::AtomicBool::new(false);
        let weak = linter.downgrade();
        linter.subscribe(move |result: &LintResult| {
            let Some(linter) = weak.upgrade() else {
                return;
            };
            let _ = seen_tx.send(linter.last_delivered(&result.uri));
            if !relinted.swap(true, std::sync::atomic::Ordering::SeqCst) {
                linter.schedule(result.uri.clone(), result.version);
            }
        });

        open(&store, "x = 1\n");
        linter.schedule(uri(), 1);

        assert_eq!(rx.recv().await.unwrap().version, 1);
        assert_eq!(rx.recv().await.unwrap().version, 1);
        assert_eq!(seen_rx.recv().await.unwrap(), Some(1));
        assert_eq!(seen_rx.recv().await.unwrap(), Some(1));
    }
}
