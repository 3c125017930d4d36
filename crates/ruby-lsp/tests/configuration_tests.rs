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

//! Configuration cache tests: batching, failure recovery and invalidation.

mod common;

use common::ScriptedFetcher;
use ruby_lsp::configuration::EntryState;
use ruby_lsp::{ConfigurationCache, FetchError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const WINDOW: Duration = Duration::from_millis(50);

fn setup() -> (Arc<ScriptedFetcher>, ConfigurationCache) {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let cache = ConfigurationCache::new(fetcher.clone(), WINDOW);
    (fetcher, cache)
}

// ============================================================================
// BATCHING
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_requests_within_window_share_one_fetch() {
    let (fetcher, cache) = setup();
    fetcher.respond(Ok(vec![json!({ "lineLength": 80 }), json!({ "lineLength": 100 })]));

    let (a, b) = tokio::join!(cache.get("workspaceA"), cache.get("workspaceB"));

    assert_eq!(
        fetcher.calls(),
        vec![vec!["workspaceA".to_string(), "workspaceB".to_string()]]
    );
    assert_eq!(a.unwrap().max_line_length(), 80);
    assert_eq!(b.unwrap().max_line_length(), 100);
    assert_eq!(cache.state("workspaceA"), EntryState::Present);
    assert_eq!(cache.state("workspaceB"), EntryState::Present);
}

#[tokio::test(start_paused = true)]
async fn test_requests_in_separate_windows_fetch_separately() {
    let (fetcher, cache) = setup();

    let first = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("a").await })
    };
    sleep(WINDOW * 2).await;
    let second = cache.get("b").await;

    assert!(first.await.unwrap().is_ok());
    assert!(second.is_ok());
    assert_eq!(
        fetcher.calls(),
        vec![vec!["a".to_string()], vec!["b".to_string()]]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pending_scope_joins_in_flight_fetch() {
    let (fetcher, cache) = setup();
    let release = fetcher.hold_next();

    let first = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("a").await })
    };
    sleep(WINDOW * 2).await;
    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(cache.state("a"), EntryState::Pending);

    // The window has closed but "a" is still in flight: no second fetch.
    let second = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("a").await })
    };
    sleep(WINDOW * 2).await;
    release.send(()).unwrap();

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(fetcher.calls().len(), 1);
}

// ============================================================================
// FAILURE RECOVERY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_returns_entries_to_absent() {
    let (fetcher, cache) = setup();
    let error = FetchError::Transport("connection reset".to_string());
    fetcher.respond(Err(error.clone()));

    let (a, b) = tokio::join!(cache.get("a"), cache.get("b"));
    assert_eq!(a, Err(error.clone()));
    assert_eq!(b, Err(error));
    assert_eq!(cache.state("a"), EntryState::Absent);
    assert_eq!(cache.state("b"), EntryState::Absent);

    fetcher.respond(Ok(vec![json!({ "lineLength": 90 })]));
    let retried = cache.get("a").await.unwrap();
    assert_eq!(retried.max_line_length(), 90);
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_length_mismatch_fails_batch() {
    let (fetcher, cache) = setup();
    fetcher.respond(Ok(vec![json!({})]));

    let (a, b) = tokio::join!(cache.get("a"), cache.get("b"));
    let expected = FetchError::LengthMismatch {
        expected: 2,
        actual: 1,
    };
    assert_eq!(a, Err(expected.clone()));
    assert_eq!(b, Err(expected));
    assert_eq!(cache.state("a"), EntryState::Absent);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_settings_fail_only_their_scope() {
    let (fetcher, cache) = setup();
    fetcher.respond(Ok(vec![json!({ "lineLength": "wide" }), json!(null)]));

    let (bad, good) = tokio::join!(cache.get("bad"), cache.get("good"));
    assert!(matches!(bad, Err(FetchError::InvalidSettings { ref scope, .. }) if scope == "bad"));
    assert_eq!(good.unwrap().max_line_length(), ruby_lint::DEFAULT_MAX_LINE_LENGTH);
    assert_eq!(cache.state("bad"), EntryState::Absent);
    assert_eq!(cache.state("good"), EntryState::Present);
}

// ============================================================================
// INVALIDATION & SHUTDOWN
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_invalidate_during_fetch_refetches_next_time() {
    let (fetcher, cache) = setup();
    let release = fetcher.hold_next();
    fetcher.respond(Ok(vec![json!({ "lineLength": 70 })]));
    fetcher.respond(Ok(vec![json!({ "lineLength": 75 })]));

    let waiter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("a").await })
    };
    sleep(WINDOW * 2).await;
    cache.invalidate("a");
    release.send(()).unwrap();

    // The waiter still gets the in-flight answer, but it is not cached.
    assert_eq!(waiter.await.unwrap().unwrap().max_line_length(), 70);
    assert_eq!(cache.state("a"), EntryState::Absent);

    assert_eq!(cache.get("a").await.unwrap().max_line_length(), 75);
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_in_flight_fetch() {
    let (fetcher, cache) = setup();
    let _release = fetcher.hold_next();

    let waiter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("a").await })
    };
    sleep(WINDOW * 2).await;
    assert_eq!(fetcher.calls().len(), 1);

    cache.shutdown();
    assert_eq!(waiter.await.unwrap(), Err(FetchError::Cancelled));
    assert_eq!(cache.state("a"), EntryState::Absent);
    assert_eq!(cache.get("a").await, Err(FetchError::Cancelled));
}
