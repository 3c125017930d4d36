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

//! Per-scope settings fetched lazily from the client.
//!
//! A scope is either present (cached), pending (part of a batch that has not
//! been answered yet) or absent (no entry). Requests for absent scopes made
//! within one batching window are merged into a single
//! [`ConfigurationFetcher::fetch`] call; requests for a pending scope wait on
//! the batch already carrying it, so each scope has at most one fetch in
//! flight.

use crate::config::RubyConfiguration;
use crate::error::FetchError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Source of raw settings values, one per requested scope, in request order.
#[tower_lsp::async_trait]
pub trait ConfigurationFetcher: Send + Sync {
    async fn fetch(&self, scopes: Vec<String>) -> Result<Vec<Value>, FetchError>;
}

pub type Settings = Arc<RubyConfiguration>;

type Reply = oneshot::Sender<Result<Settings, FetchError>>;

/// Observable state of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Absent,
    Pending,
    Present,
}

enum Entry {
    Pending { batch: u64, stale: bool },
    Present(Settings),
}

struct Batch {
    id: u64,
    scopes: Vec<String>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    open_batch: Option<Batch>,
    waiters: HashMap<u64, HashMap<String, Vec<Reply>>>,
    next_batch: u64,
    shut_down: bool,
}

struct Inner {
    fetcher: Arc<dyn ConfigurationFetcher>,
    window: Duration,
    state: Mutex<State>,
    shutdown: CancellationToken,
    fetches: AtomicU64,
}

/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct ConfigurationCache {
    inner: Arc<Inner>,
}

impl ConfigurationCache {
    pub fn new(fetcher: Arc<dyn ConfigurationFetcher>, window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                window,
                state: Mutex::new(State::default()),
                shutdown: CancellationToken::new(),
                fetches: AtomicU64::new(0),
            }),
        }
    }

    /// Settings for `scope`, fetching them if they are not cached.
    pub async fn get(&self, scope: &str) -> Result<Settings, FetchError> {
        let receiver = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return Err(FetchError::Cancelled);
            }

            let pending_batch = match state.entries.get(scope) {
                Some(Entry::Present(settings)) => return Ok(Arc::clone(settings)),
                Some(Entry::Pending { batch, .. }) => Some(*batch),
                None => None,
            };

            let batch = match pending_batch {
                Some(batch) => batch,
                None => {
                    let batch = self.join_window(&mut state, scope);
                    state
                        .entries
                        .insert(scope.to_string(), Entry::Pending { batch, stale: false });
                    batch
                }
            };

            let (reply, receiver) = oneshot::channel();
            state
                .waiters
                .entry(batch)
                .or_default()
                .entry(scope.to_string())
                .or_default()
                .push(reply);
            receiver
        };

        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Cancelled),
        }
    }

    /// Add `scope` to the open batch, opening one (and its timer) if needed.
    fn join_window(&self, state: &mut State, scope: &str) -> u64 {
        if let Some(batch) = state.open_batch.as_mut() {
            batch.scopes.push(scope.to_string());
            return batch.id;
        }

        state.next_batch += 1;
        let id = state.next_batch;
        state.open_batch = Some(Batch {
            id,
            scopes: vec![scope.to_string()],
        });
        debug!("Opened configuration batch {}", id);
        tokio::spawn(Inner::run_batch(Arc::clone(&self.inner), id));
        id
    }

    /// Forget the settings for `scope`. An in-flight request still answers its
    /// waiters but is not cached.
    pub fn invalidate(&self, scope: &str) {
        let mut state = self.inner.state.lock();
        Self::invalidate_entry(&mut state, scope);
    }

    pub fn invalidate_all(&self) {
        let mut state = self.inner.state.lock();
        let scopes: Vec<String> = state.entries.keys().cloned().collect();
        for scope in scopes {
            Self::invalidate_entry(&mut state, &scope);
        }
        debug!("Configuration cache invalidated");
    }

    fn invalidate_entry(state: &mut State, scope: &str) {
        match state.entries.get_mut(scope) {
            Some(Entry::Pending { stale, .. }) => *stale = true,
            Some(Entry::Present(_)) => {
                state.entries.remove(scope);
            }
            None => {}
        }
    }

    pub fn state(&self, scope: &str) -> EntryState {
        match self.inner.state.lock().entries.get(scope) {
            None => EntryState::Absent,
            Some(Entry::Pending { .. }) => EntryState::Pending,
            Some(Entry::Present(_)) => EntryState::Present,
        }
    }

    /// Number of fetcher calls made so far.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetches.load(Ordering::Relaxed)
    }

    /// Fail every waiter with [`FetchError::Cancelled`] and stop caching.
    /// Later calls to [`get`](Self::get) fail immediately.
    pub fn shutdown(&self) {
        let waiters = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.open_batch = None;
            state.entries.clear();
            std::mem::take(&mut state.waiters)
        };
        self.inner.shutdown.cancel();

        for reply in waiters.into_values().flat_map(HashMap::into_values).flatten() {
            let _ = reply.send(Err(FetchError::Cancelled));
        }
        debug!("Configuration cache shut down");
    }
}

impl Inner {
    async fn run_batch(self: Arc<Self>, id: u64) {
        tokio::select! {
            _ = self.shutdown.cancelled() => return,
            _ = tokio::time::sleep(self.window) => {}
        }

        let scopes = {
            let mut state = self.state.lock();
            match state.open_batch.take() {
                Some(batch) if batch.id == id => batch.scopes,
                other => {
                    state.open_batch = other;
                    return;
                }
            }
        };

        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!("Fetching configuration for {} scopes: {:?}", scopes.len(), scopes);
        let result = tokio::select! {
            _ = self.shutdown.cancelled() => Err(FetchError::Cancelled),
            result = self.fetcher.fetch(scopes.clone()) => result,
        };
        self.resolve(id, &scopes, result);
    }

    fn resolve(&self, id: u64, scopes: &[String], result: Result<Vec<Value>, FetchError>) {
        let outcomes: Vec<Result<Settings, FetchError>> = match result {
            Ok(values) if values.len() == scopes.len() => values
                .into_iter()
                .zip(scopes)
                .map(|(value, scope)| {
                    RubyConfiguration::from_value(value)
                        .map(Arc::new)
                        .map_err(|e| FetchError::InvalidSettings {
                            scope: scope.clone(),
                            message: e.to_string(),
                        })
                })
                .collect(),
            Ok(values) => {
                let error = FetchError::LengthMismatch {
                    expected: scopes.len(),
                    actual: values.len(),
                };
                vec![Err(error); scopes.len()]
            }
            Err(error) => vec![Err(error); scopes.len()],
        };

        let mut state = self.state.lock();
        let mut waiters = state.waiters.remove(&id).unwrap_or_default();
        let shut_down = state.shut_down;

        for (scope, outcome) in scopes.iter().zip(outcomes) {
            if let Err(e) = &outcome {
                warn!("Configuration for {} unavailable: {}", scope, e);
            }

            let stale = match state.entries.get(scope) {
                Some(Entry::Pending { batch, stale }) if *batch == id => Some(*stale),
                _ => None,
            };
            if let Some(stale) = stale {
                match &outcome {
                    Ok(settings) if !stale && !shut_down => {
                        state
                            .entries
                            .insert(scope.clone(), Entry::Present(Arc::clone(settings)));
                    }
                    _ => {
                        state.entries.remove(scope);
                    }
                }
            }

            for reply in waiters.remove(scope).unwrap_or_default() {
                let _ = reply.send(outcome.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Answers `{"lineLength": n}` with `n` taken from the scope name length.
    struct LengthFetcher {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[tower_lsp::async_trait]
    impl ConfigurationFetcher for LengthFetcher {
        async fn fetch(&self, scopes: Vec<String>) -> Result<Vec<Value>, FetchError> {
            self.calls.lock().push(scopes.clone());
            Ok(scopes
                .iter()
                .map(|scope| json!({ "lineLength": scope.len() * 10 }))
                .collect())
        }
    }

    fn cache() -> (Arc<LengthFetcher>, ConfigurationCache) {
        let fetcher = Arc::new(LengthFetcher {
            calls: Mutex::new(Vec::new()),
        });
        let cache = ConfigurationCache::new(fetcher.clone(), Duration::from_millis(50));
        (fetcher, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_present_entries_are_served_from_cache() {
        let (fetcher, cache) = cache();
        let first = cache.get("abc").await.unwrap();
        assert_eq!(first.max_line_length(), 30);
        assert_eq!(cache.state("abc"), EntryState::Present);

        let second = cache.get("abc").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_requests_share_one_fetch() {
        let (fetcher, cache) = cache();
        let (a, b) = tokio::join!(cache.get("ab"), cache.get("ab"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(*fetcher.calls.lock(), vec![vec!["ab".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_present_entry() {
        let (_fetcher, cache) = cache();
        cache.get("a").await.unwrap();
        cache.invalidate("a");
        assert_eq!(cache.state("a"), EntryState::Absent);
        cache.get("a").await.unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_pending_entry_is_not_cached() {
        let (_fetcher, cache) = cache();
        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("a").await })
        };
        tokio::task::yield_now().await;
        assert_eq!(cache.state("a"), EntryState::Pending);

        cache.invalidate_all();
        assert!(pending.await.unwrap().is_ok());
        assert_eq!(cache.state("a"), EntryState::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_fails_waiters() {
        let (_fetcher, cache) = cache();
        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("a").await })
        };
        tokio::task::yield_now().await;

        cache.shutdown();
        cache.shutdown();
        assert_eq!(pending.await.unwrap(), Err(FetchError::Cancelled));
        assert_eq!(cache.get("a").await, Err(FetchError::Cancelled));
        assert_eq!(cache.fetch_count(), 0);
    }
}
