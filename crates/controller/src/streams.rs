// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifetimes of per-engine metrics stream tasks.
//!
//! Every stream task spawned for a collection registers here under a
//! collection-owned cancellation token. Terminate cancels the token and
//! joins every task, so after it returns no streaming worker exists for
//! the collection.

use parking_lot::Mutex;
use stampede_core::CollectionId;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct CollectionStreams {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Registry of live stream tasks, keyed by collection.
#[derive(Default)]
pub struct StreamRegistry {
    inner: Mutex<HashMap<CollectionId, CollectionStreams>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collection's cancellation token, created on first use.
    pub fn token(&self, collection: CollectionId) -> CancellationToken {
        self.inner.lock().entry(collection).or_default().cancel.clone()
    }

    /// Track a spawned task under the collection.
    pub fn register(&self, collection: CollectionId, task: JoinHandle<()>) {
        let mut inner = self.inner.lock();
        let entry = inner.entry(collection).or_default();
        // Reap finished handles so long-lived collections don't accumulate.
        entry.tasks.retain(|t| !t.is_finished());
        entry.tasks.push(task);
    }

    /// Count of tasks still running for the collection.
    pub fn active(&self, collection: CollectionId) -> usize {
        self.inner
            .lock()
            .get(&collection)
            .map(|e| e.tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// Cancel and join every task of the collection. Idempotent; safe to
    /// race with another caller, both succeed.
    pub async fn cancel_and_join(&self, collection: CollectionId) {
        let entry = self.inner.lock().remove(&collection);
        let Some(entry) = entry else { return };
        entry.cancel.cancel();
        for task in entry.tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!(%collection, error = %e, "stream task join failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "streams_tests.rs"]
mod tests;
