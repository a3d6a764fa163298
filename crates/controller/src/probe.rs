// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous status composition.

use stampede_core::{CatalogStore, CollectionId, CoreError, StatusSnapshot};
use stampede_scheduler::Scheduler;
use std::sync::Arc;

/// Answers status queries by composing the catalog's expectations, the
/// scheduler's observations, and the run ledger's overlay. Pure read; no
/// state change anywhere.
pub struct StatusProbe<S, C> {
    scheduler: Arc<S>,
    catalog: Arc<C>,
}

impl<S: Scheduler, C: CatalogStore> StatusProbe<S, C> {
    pub fn new(scheduler: Arc<S>, catalog: Arc<C>) -> Self {
        Self { scheduler, catalog }
    }

    pub async fn status(&self, collection: CollectionId) -> Result<StatusSnapshot, CoreError> {
        let plans = self.catalog.list_execution_plans(collection).await?;
        let mut rows = self
            .scheduler
            .collection_status(collection, &plans)
            .await
            .map_err(CoreError::from)?;

        // `in_progress` and `started_at_ms` come from the ledger, never
        // from the scheduler.
        let open = self.catalog.open_run(collection).await?;
        if let Some(run) = &open {
            for row in &mut rows {
                row.in_progress = true;
                row.started_at_ms = Some(run.started_at_ms);
            }
        }

        let runs = self.catalog.runs_for(collection).await?;
        let any_ended = runs.iter().any(|r| !r.is_open());
        let state = StatusSnapshot::derive_state(&rows, open.as_ref(), any_ended);

        Ok(StatusSnapshot { collection, state, plans: rows, run: open })
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
