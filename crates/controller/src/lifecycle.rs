// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-collection lifecycle state machine.
//!
//! ```text
//! Empty ──deploy──▶ Deploying ──all-reachable──▶ Deployed
//!                       │                           │
//!                       ▼                        trigger
//!                  DeployFailed                     ▼
//!                                               Running ──engines-finish──▶ Ran
//!                                                   │
//!                                               terminate
//!                                                   ▼
//!                                               Terminated ──purge──▶ Purged
//! ```
//!
//! Operations on one collection serialize through its gate; different
//! collections proceed in parallel. Within an operation, per-plan and
//! per-engine work fans out concurrently and both successes and failures
//! are collected before returning. Terminate and purge run on detached
//! tasks so they complete even when the initiating caller goes away.

use crate::config::ControllerConfig;
use crate::ledger::RunLedger;
use crate::retry::{retry_transient, SCHEDULER_WRITE_DELAYS};
use crate::stager::{ArtifactStager, StagedEngine};
use crate::streams::StreamRegistry;
use parking_lot::Mutex;
use stampede_client::EngineApi;
use stampede_core::{
    BlobStore, CatalogStore, Clock, CollectionId, CollectionState, ConflictKind, CoreError,
    EngineAddress, EngineRunConfig, ExecutionPlan, OperationReport, PlanId, PlanStatus, RunId,
    Sample, WorkerRef,
};
use stampede_metrics::MetricsHub;
use stampede_scheduler::{DeploySpec, Scheduler};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Outcome of a trigger: the run that was opened plus the per-engine
/// report. When `report.primary` is set the run was already closed and
/// started engines stopped.
#[derive(Debug)]
pub struct TriggerReport {
    pub run_id: RunId,
    pub report: OperationReport,
}

struct Inner<S, E, C, B, K> {
    scheduler: Arc<S>,
    engines: Arc<E>,
    catalog: Arc<C>,
    stager: ArtifactStager<B>,
    ledger: RunLedger<C, K>,
    hub: Arc<MetricsHub>,
    clock: K,
    config: ControllerConfig,
    /// Per-collection operation gates. Entry creation is itself
    /// synchronized by the outer mutex.
    gates: Mutex<HashMap<CollectionId, Arc<tokio::sync::Mutex<()>>>>,
    states: Mutex<HashMap<CollectionId, CollectionState>>,
    /// Staged engine configs per deployed collection. Dropped on purge,
    /// which releases the blob references staging held.
    staged: Mutex<HashMap<CollectionId, HashMap<PlanId, Vec<StagedEngine>>>>,
    streams: StreamRegistry,
}

/// Drives collections through deploy, trigger, terminate, and purge.
pub struct LifecycleController<S, E, C, B, K>(Arc<Inner<S, E, C, B, K>>);

impl<S, E, C, B, K> Clone for LifecycleController<S, E, C, B, K> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S, E, C, B, K> LifecycleController<S, E, C, B, K>
where
    S: Scheduler,
    E: EngineApi,
    C: CatalogStore,
    B: BlobStore,
    K: Clock,
{
    pub fn new(
        scheduler: Arc<S>,
        engines: Arc<E>,
        catalog: Arc<C>,
        blobs: Arc<B>,
        hub: Arc<MetricsHub>,
        clock: K,
        config: ControllerConfig,
    ) -> Self {
        let stager = ArtifactStager::new(blobs, config.presign_ttl);
        let ledger = RunLedger::new(catalog.clone(), clock.clone());
        Self(Arc::new(Inner {
            scheduler,
            engines,
            catalog,
            stager,
            ledger,
            hub,
            clock,
            config,
            gates: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
            staged: Mutex::new(HashMap::new()),
            streams: StreamRegistry::new(),
        }))
    }

    /// Lifecycle position as the controller last drove it. Collections it
    /// never touched read as `Empty`.
    pub fn state(&self, collection: CollectionId) -> CollectionState {
        self.0
            .states
            .lock()
            .get(&collection)
            .copied()
            .unwrap_or(CollectionState::Empty)
    }

    /// Live sample feed for a collection (bounded; drop-newest).
    pub fn subscribe_metrics(
        &self,
        collection: CollectionId,
    ) -> mpsc::Receiver<stampede_metrics::SampleEvent> {
        self.0.hub.subscribe(collection)
    }

    /// Text exposition of the aggregate metrics.
    pub fn scrape_metrics(&self) -> String {
        self.0.hub.scrape()
    }

    pub fn hub(&self) -> &Arc<MetricsHub> {
        &self.0.hub
    }

    pub fn ledger(&self) -> &RunLedger<C, K> {
        &self.0.ledger
    }

    /// Streams still live for a collection (drained to zero by purge).
    pub fn active_streams(&self, collection: CollectionId) -> usize {
        self.0.streams.active(collection)
    }

    fn gate(&self, collection: CollectionId) -> Arc<tokio::sync::Mutex<()>> {
        self.0
            .gates
            .lock()
            .entry(collection)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn set_state(&self, collection: CollectionId, state: CollectionState) {
        tracing::debug!(%collection, %state, "state transition");
        self.0.states.lock().insert(collection, state);
    }

    async fn with_scheduler_timeout<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.0.config.scheduler_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout(format!("scheduler {}", what))),
        }
    }

    async fn scheduler_status(
        &self,
        collection: CollectionId,
        plans: &[ExecutionPlan],
    ) -> Result<Vec<PlanStatus>, CoreError> {
        self.with_scheduler_timeout("collection_status", async {
            self.0
                .scheduler
                .collection_status(collection, plans)
                .await
                .map_err(CoreError::from)
        })
        .await
    }

    // ── Deploy ──────────────────────────────────────────────────────────

    /// Stage artifacts, provision engines for every execution plan, and
    /// poll until all of them answer the liveness check.
    ///
    /// On readiness timeout the collection transitions to `DeployFailed`
    /// and is deliberately NOT purged; the operator decides.
    pub async fn deploy(&self, collection: CollectionId) -> Result<OperationReport, CoreError> {
        let gate = self.gate(collection);
        let _gate = gate.lock().await;

        let col = self.0.catalog.get_collection(collection).await?;
        let plans = col.plans.clone();

        // A live worker pins engines and concurrency (invariant pre-check).
        let live = self.scheduler_status(collection, &plans).await?;
        let staged_prev = self.0.staged.lock().get(&collection).cloned();
        for (exec, status) in plans.iter().zip(&live) {
            if status.engines_deployed == 0 {
                continue;
            }
            if status.engines_deployed != exec.engines {
                return Err(CoreError::Conflict(ConflictKind::EditWhileDeployed));
            }
            let staged_concurrency = staged_prev
                .as_ref()
                .and_then(|staged| staged.get(&exec.plan_id))
                .and_then(|configs| configs.first())
                .map(|c| c.concurrency);
            if staged_concurrency.is_some_and(|c| c != exec.concurrency) {
                return Err(CoreError::Conflict(ConflictKind::EditWhileDeployed));
            }
        }

        self.set_state(collection, CollectionState::Deploying);

        // Stage every plan before the first scheduler call, so a missing
        // artifact aborts with nothing provisioned.
        let mut staged: HashMap<PlanId, Vec<StagedEngine>> = HashMap::new();
        for exec in &plans {
            let plan = self.0.catalog.get_plan(exec.plan_id).await?;
            staged.insert(exec.plan_id, self.0.stager.stage(&plan, exec).await?);
        }

        let mut tasks: JoinSet<(PlanId, Result<(), CoreError>)> = JoinSet::new();
        for exec in &plans {
            let spec = DeploySpec {
                project: col.project_id,
                collection,
                plan: exec.plan_id,
                replicas: exec.engines,
                container: self.0.config.container.clone(),
            };
            let this = self.clone();
            tasks.spawn(async move {
                let plan = spec.plan;
                let result = retry_transient("deploy_plan", &SCHEDULER_WRITE_DELAYS, || {
                    let this = this.clone();
                    let spec = spec.clone();
                    async move {
                        this.with_scheduler_timeout("deploy_plan", async {
                            this.0.scheduler.deploy_plan(&spec).await.map_err(CoreError::from)
                        })
                        .await
                    }
                })
                .await;
                (plan, result)
            });
        }

        let mut report = OperationReport::default();
        while let Some(joined) = tasks.join_next().await {
            let Ok((plan, result)) = joined else { continue };
            if let Err(e) = result {
                tracing::error!(%collection, %plan, error = %e, "plan deployment failed");
                report.failure(WorkerRef::new(col.project_id, collection, plan, 0), e);
            }
        }
        if !report.failures.is_empty() {
            self.set_state(collection, CollectionState::DeployFailed);
            let primary = report.failures[0].error.clone();
            return Ok(report.failed(primary));
        }

        self.0.staged.lock().insert(collection, staged);

        let deadline = self.0.clock.now() + self.0.config.deploy_deadline;
        loop {
            let status = self.scheduler_status(collection, &plans).await?;
            if status.iter().all(|p| p.engines_reachable) {
                break;
            }
            if self.0.clock.now() >= deadline {
                self.set_state(collection, CollectionState::DeployFailed);
                // No automatic purge here: the operator decides.
                return Err(CoreError::Timeout(format!(
                    "collection {} not fully reachable within deploy deadline",
                    collection
                )));
            }
            tokio::time::sleep(self.0.config.deploy_poll_interval).await;
        }

        for exec in &plans {
            for ordinal in 0..exec.engines {
                report.success(WorkerRef::new(col.project_id, collection, exec.plan_id, ordinal));
            }
        }
        self.set_state(collection, CollectionState::Deployed);
        tracing::info!(%collection, engines = %report.tally(), "deployed");
        Ok(report)
    }

    // ── Trigger ─────────────────────────────────────────────────────────

    /// Open a run and start every reachable engine with its staged
    /// configuration.
    ///
    /// Any engine rejection fails the trigger: started engines are
    /// stopped and the run closed. Unreachable engines fail the trigger
    /// only at or above the configured fraction; below it the run
    /// proceeds and the failures are recorded in the report.
    pub async fn trigger(&self, collection: CollectionId) -> Result<TriggerReport, CoreError> {
        let gate = self.gate(collection);
        let _gate = gate.lock().await;

        let col = self.0.catalog.get_collection(collection).await?;
        let staged = self
            .0
            .staged
            .lock()
            .get(&collection)
            .cloned()
            .ok_or(CoreError::Conflict(ConflictKind::NotDeployed))?;

        let run_id = self.0.ledger.start_run(collection).await?;

        let mut report = OperationReport::default();
        let mut to_start: Vec<(EngineAddress, EngineRunConfig)> = Vec::new();
        let mut total: u32 = 0;
        for exec in &col.plans {
            total += exec.engines;
            let addrs = match self
                .with_scheduler_timeout("reachable_addresses", async {
                    self.0
                        .scheduler
                        .reachable_addresses(collection, exec.plan_id)
                        .await
                        .map_err(CoreError::from)
                })
                .await
            {
                Ok(addrs) => addrs,
                Err(e) => {
                    let _ = self.0.ledger.end_run(collection).await;
                    return Err(e);
                }
            };
            let configs = staged.get(&exec.plan_id);
            for ordinal in 0..exec.engines {
                let worker = WorkerRef::new(col.project_id, collection, exec.plan_id, ordinal);
                let addr = addrs.iter().find(|a| a.worker.ordinal == ordinal);
                let config = configs.and_then(|c| c.get(ordinal as usize));
                match (addr, config) {
                    (Some(addr), Some(config)) => {
                        to_start.push((addr.clone(), config.run_config(run_id)));
                    }
                    _ => report.failure(
                        worker,
                        CoreError::EngineUnreachable("no reachable address".to_string()),
                    ),
                }
            }
        }

        let mut tasks: JoinSet<(EngineAddress, Result<(), CoreError>)> = JoinSet::new();
        for (addr, config) in to_start {
            let this = self.clone();
            tasks.spawn(async move {
                let result = match tokio::time::timeout(
                    this.0.config.engine_timeout,
                    this.0.engines.start(&addr, &config),
                )
                .await
                {
                    Ok(r) => r.map_err(CoreError::from),
                    Err(_) => Err(CoreError::Timeout(format!("start {}", addr.worker))),
                };
                (addr, result)
            });
        }

        let mut started: Vec<EngineAddress> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Ok((addr, result)) = joined else { continue };
            match result {
                Ok(()) => {
                    report.success(addr.worker);
                    started.push(addr);
                }
                Err(e) => report.failure(addr.worker, e),
            }
        }

        let rejection = report
            .failures
            .iter()
            .find(|f| matches!(f.error, CoreError::EngineRejected { .. }))
            .map(|f| f.error.clone());
        if let Some(primary) = rejection {
            tracing::warn!(%collection, %run_id, "engine rejected start, aborting trigger");
            self.stop_engines(&started, &mut OperationReport::default()).await;
            let _ = self.0.ledger.end_run(collection).await;
            return Ok(TriggerReport { run_id, report: report.failed(primary) });
        }

        let unreachable = report.failures.len() as u32;
        if total > 0 && f64::from(unreachable) / f64::from(total) >= self.0.config.max_unreachable_ratio
        {
            tracing::warn!(
                %collection,
                %run_id,
                unreachable,
                total,
                "unreachable fraction at or above threshold, aborting trigger"
            );
            self.stop_engines(&started, &mut OperationReport::default()).await;
            let _ = self.0.ledger.end_run(collection).await;
            let primary = report
                .failures
                .first()
                .map(|f| f.error.clone())
                .unwrap_or_else(|| CoreError::EngineUnreachable("no engines".to_string()));
            return Ok(TriggerReport { run_id, report: report.failed(primary) });
        }

        self.spawn_streams(collection, &started);
        self.set_state(collection, CollectionState::Running);
        tracing::info!(%collection, %run_id, engines = started.len(), "run triggered");
        Ok(TriggerReport { run_id, report })
    }

    // ── Terminate ───────────────────────────────────────────────────────

    /// Stop every known engine, tear down metrics streams, close the open
    /// run. Idempotent; per-engine stop failures are notes, not errors.
    /// Runs to completion even if the initiating caller is cancelled.
    pub async fn terminate(&self, collection: CollectionId) -> OperationReport {
        let this = self.clone();
        tokio::spawn(async move {
            let gate = this.gate(collection);
            let _gate = gate.lock().await;
            this.terminate_locked(collection).await
        })
        .await
        .unwrap_or_default()
    }

    async fn terminate_locked(&self, collection: CollectionId) -> OperationReport {
        let mut report = OperationReport::default();

        // Unknown collections (reconcile path) still tear down streams
        // and close any run; worker stops need the plan list.
        let plans = match self.0.catalog.list_execution_plans(collection).await {
            Ok(plans) => plans,
            Err(e) => {
                tracing::debug!(%collection, error = %e, "no catalog record during terminate");
                Vec::new()
            }
        };

        let mut addrs: Vec<EngineAddress> = Vec::new();
        for exec in &plans {
            match self.0.scheduler.reachable_addresses(collection, exec.plan_id).await {
                Ok(mut found) => addrs.append(&mut found),
                Err(e) => tracing::warn!(
                    %collection,
                    plan = %exec.plan_id,
                    error = %e,
                    "address enumeration failed during terminate"
                ),
            }
        }

        self.stop_engines(&addrs, &mut report).await;
        self.0.streams.cancel_and_join(collection).await;
        if let Err(e) = self.0.ledger.end_run(collection).await {
            tracing::warn!(%collection, error = %e, "failed to close run during terminate");
        }
        if matches!(self.state(collection), CollectionState::Running | CollectionState::Ran) {
            self.set_state(collection, CollectionState::Terminated);
        }
        tracing::info!(%collection, stopped = %report.tally(), "terminated");
        report
    }

    /// Concurrent best-effort stops; outcomes land in `report`.
    async fn stop_engines(&self, addrs: &[EngineAddress], report: &mut OperationReport) {
        let mut tasks: JoinSet<(EngineAddress, Result<(), CoreError>)> = JoinSet::new();
        for addr in addrs {
            let this = self.clone();
            let addr = addr.clone();
            tasks.spawn(async move {
                let result = match tokio::time::timeout(
                    this.0.config.engine_timeout,
                    this.0.engines.stop(&addr),
                )
                .await
                {
                    Ok(r) => r.map_err(CoreError::from),
                    Err(_) => Err(CoreError::Timeout(format!("stop {}", addr.worker))),
                };
                (addr, result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let Ok((addr, result)) = joined else { continue };
            match result {
                Ok(()) => report.success(addr.worker),
                Err(e) => {
                    tracing::warn!(worker = %addr.worker, error = %e, "engine stop failed");
                    report.failure(addr.worker, e);
                }
            }
        }
    }

    // ── Purge ───────────────────────────────────────────────────────────

    /// Terminate, then remove all workers and release staged and metrics
    /// state. Idempotent; runs to completion even if the initiating
    /// caller is cancelled.
    pub async fn purge(&self, collection: CollectionId) -> Result<OperationReport, CoreError> {
        let this = self.clone();
        tokio::spawn(async move {
            let gate = this.gate(collection);
            let _gate = gate.lock().await;

            let report = this.terminate_locked(collection).await;
            retry_transient("purge", &SCHEDULER_WRITE_DELAYS, || {
                let this = this.clone();
                async move {
                    this.with_scheduler_timeout("purge", async {
                        this.0.scheduler.purge(collection).await.map_err(CoreError::from)
                    })
                    .await
                }
            })
            .await?;

            this.0.staged.lock().remove(&collection);
            this.0.hub.purge_collection(collection);
            this.set_state(collection, CollectionState::Purged);
            tracing::info!(%collection, "purged");
            Ok(report)
        })
        .await
        .unwrap_or(Err(CoreError::Canceled))
    }

    // ── Metrics streams ─────────────────────────────────────────────────

    /// One stream reader and one hub pump per started engine, all tied to
    /// the collection's cancellation token, plus a watcher that closes
    /// the run once every engine finishes on its own.
    fn spawn_streams(&self, collection: CollectionId, started: &[EngineAddress]) {
        let token = self.0.streams.token(collection);
        let slots = self
            .0
            .config
            .max_streams_per_collection
            .saturating_sub(self.0.streams.active(collection));
        if started.len() > slots {
            tracing::warn!(
                %collection,
                engines = started.len(),
                slots,
                "per-collection stream cap reached, excess engines not streamed"
            );
        }

        let mut pumps = Vec::new();
        for addr in started.iter().take(slots) {
            let plan = addr.worker.plan;
            let engine = addr.worker.ordinal;
            let (tx, mut rx) = mpsc::channel::<Sample>(self.0.config.stream_buffer);

            let engines = self.0.engines.clone();
            let cancel = token.child_token();
            let addr = addr.clone();
            let reader = tokio::spawn(async move {
                match engines.stream_metrics(&addr, tx, cancel).await {
                    Ok(end) => {
                        tracing::debug!(worker = %addr.worker, ?end, "metrics stream ended")
                    }
                    Err(e) => {
                        tracing::warn!(worker = %addr.worker, error = %e, "metrics stream failed")
                    }
                }
            });
            self.0.streams.register(collection, reader);

            let hub = self.0.hub.clone();
            let clock = self.0.clock.clone();
            pumps.push(tokio::spawn(async move {
                while let Some(sample) = rx.recv().await {
                    hub.ingest(collection, plan, engine, &sample, clock.epoch_ms());
                }
            }));
        }

        let this = self.clone();
        let watcher_token = token.clone();
        let watcher = tokio::spawn(async move {
            for pump in pumps {
                let _ = pump.await;
            }
            if watcher_token.is_cancelled() {
                return;
            }
            // Every engine reached EOF on its own: the run is over.
            if let Err(e) = this.0.ledger.end_run(collection).await {
                tracing::warn!(%collection, error = %e, "failed to close run after engines finished");
            }
            this.set_state(collection, CollectionState::Ran);
            tracing::info!(%collection, "engines finished, run closed");
        });
        self.0.streams.register(collection, watcher);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
