// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background convergence sweep.
//!
//! Detects deployed-but-unknown and abandoned collections and purges
//! them. Idempotency is the loop's correctness guarantee: a sweep racing
//! an operator-driven purge is fine, both succeed.

use crate::config::ReconcileConfig;
use crate::lifecycle::LifecycleController;
use stampede_client::EngineApi;
use stampede_core::{BlobStore, CatalogStore, Clock, CoreError};
use stampede_scheduler::Scheduler;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Periodic garbage collector for stale deployments.
pub struct ReconcileLoop<S, E, C, B, K> {
    controller: LifecycleController<S, E, C, B, K>,
    scheduler: Arc<S>,
    catalog: Arc<C>,
    clock: K,
    config: ReconcileConfig,
}

impl<S, E, C, B, K> ReconcileLoop<S, E, C, B, K>
where
    S: Scheduler,
    E: EngineApi,
    C: CatalogStore,
    B: BlobStore,
    K: Clock,
{
    pub fn new(
        controller: LifecycleController<S, E, C, B, K>,
        scheduler: Arc<S>,
        catalog: Arc<C>,
        clock: K,
        config: ReconcileConfig,
    ) -> Self {
        Self { controller, scheduler, catalog, clock, config }
    }

    /// One sweep. Errors are logged and never stop the pass.
    pub async fn tick(&self) {
        let deployed = match self.scheduler.list_deployed_collections().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "reconcile enumeration failed");
                return;
            }
        };

        let now_ms = self.clock.epoch_ms();
        let max_idle_ms = self.config.max_idle.as_millis() as u64;

        for (collection, deployed_at_ms) in deployed {
            let purge_reason = match self.catalog.get_collection(collection).await {
                Err(CoreError::NotFound { .. }) => Some("unknown to catalog"),
                Err(e) => {
                    tracing::warn!(%collection, error = %e, "catalog read failed during reconcile");
                    None
                }
                Ok(_) if now_ms.saturating_sub(deployed_at_ms) <= max_idle_ms => None,
                Ok(_) => match self.catalog.open_run(collection).await {
                    Ok(None) => Some("idle past max-idle with no open run"),
                    Ok(Some(_)) => None,
                    Err(e) => {
                        tracing::warn!(%collection, error = %e, "ledger read failed during reconcile");
                        None
                    }
                },
            };

            let Some(reason) = purge_reason else { continue };
            tracing::info!(%collection, reason, "reconcile purging stale deployment");
            if let Err(e) = self.controller.purge(collection).await {
                tracing::warn!(%collection, error = %e, "reconcile purge failed");
            }
        }
    }

    /// Run the sweep on its interval until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.config.interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh daemon
            // does not sweep before anything is deployed.
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tick.tick() => self.tick().await,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
