// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run bookkeeping: monotonic run ids, single-writer per collection.
//!
//! Serialization is delegated to the catalog's transactional guarantees;
//! the ledger adds timestamps and the typed surface.

use stampede_core::{CatalogStore, Clock, CollectionId, CoreError, RunId, RunInstance};
use std::sync::Arc;

/// Run ledger over the catalog's linearizable run operations.
pub struct RunLedger<C, K> {
    catalog: Arc<C>,
    clock: K,
}

impl<C: CatalogStore, K: Clock> RunLedger<C, K> {
    pub fn new(catalog: Arc<C>, clock: K) -> Self {
        Self { catalog, clock }
    }

    /// Open a run. Exactly one concurrent caller wins; the rest see
    /// `Conflict(RunInProgress)`.
    pub async fn start_run(&self, collection: CollectionId) -> Result<RunId, CoreError> {
        let run_id = self.catalog.start_run(collection, self.clock.epoch_ms()).await?;
        tracing::info!(%collection, %run_id, "run opened");
        Ok(run_id)
    }

    /// Close the open run, if any. Idempotent.
    pub async fn end_run(&self, collection: CollectionId) -> Result<(), CoreError> {
        self.catalog.end_run(collection, self.clock.epoch_ms()).await
    }

    pub async fn open_run(&self, collection: CollectionId) -> Result<Option<RunInstance>, CoreError> {
        self.catalog.open_run(collection).await
    }

    pub async fn runs_for(&self, collection: CollectionId) -> Result<Vec<RunInstance>, CoreError> {
        self.catalog.runs_for(collection).await
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
