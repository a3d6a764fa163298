// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory scheduler for tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`. Workers get
//! `fake://` URLs that pair with the fake engine's script keys.

use crate::{DeploySpec, Scheduler, SchedulerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use stampede_core::{
    Clock, CollectionId, ContainerSpec, EngineAddress, ExecutionPlan, PlanId, PlanStatus,
    ProjectId, WorkerRef, WorkerState,
};
use std::collections::HashMap;

struct WorkerEntry {
    state: WorkerState,
    url: String,
}

#[derive(Default)]
struct Inner {
    workers: HashMap<WorkerRef, WorkerEntry>,
    deployed_at: HashMap<CollectionId, u64>,
    transient_failures: u32,
    deploy_calls: u32,
    purge_calls: u32,
}

/// Scheduler over process memory with scriptable worker states.
pub struct InMemoryScheduler {
    inner: Mutex<Inner>,
    now_ms: Box<dyn Fn() -> u64 + Send + Sync>,
    /// State newly provisioned workers land in. `Reachable` by default so
    /// happy-path tests deploy instantly.
    initial_state: Mutex<WorkerState>,
}

impl InMemoryScheduler {
    pub fn new(clock: impl Clock) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            now_ms: Box::new(move || clock.epoch_ms()),
            initial_state: Mutex::new(WorkerState::Reachable),
        }
    }

    /// Engine URL for a worker, matching what `reachable_addresses` hands
    /// out. Tests use this to script the fake engine per worker.
    pub fn url_for(worker: &WorkerRef) -> String {
        format!("fake://{}", worker)
    }

    /// Make newly provisioned workers start in `state` instead of
    /// `Reachable` (e.g. `Provisioned` to exercise deploy timeouts).
    pub fn provision_into(&self, state: WorkerState) {
        *self.initial_state.lock() = state;
    }

    pub fn set_worker_state(&self, worker: &WorkerRef, state: WorkerState) {
        if let Some(entry) = self.inner.lock().workers.get_mut(worker) {
            entry.state = state;
        }
    }

    /// Move every worker of a collection to `state`.
    pub fn set_collection_state(&self, collection: CollectionId, state: WorkerState) {
        for entry in self
            .inner
            .lock()
            .workers
            .iter_mut()
            .filter(|(w, _)| w.collection == collection)
            .map(|(_, e)| e)
        {
            entry.state = state;
        }
    }

    /// Fail the next `n` write calls with a transient error.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.lock().transient_failures = n;
    }

    /// Backdate a deployment for reconcile tests.
    pub fn set_deployed_at(&self, collection: CollectionId, epoch_ms: u64) {
        self.inner.lock().deployed_at.insert(collection, epoch_ms);
    }

    pub fn worker_count(&self, collection: CollectionId) -> usize {
        self.inner
            .lock()
            .workers
            .keys()
            .filter(|w| w.collection == collection)
            .count()
    }

    pub fn deploy_calls(&self) -> u32 {
        self.inner.lock().deploy_calls
    }

    pub fn purge_calls(&self) -> u32 {
        self.inner.lock().purge_calls
    }

    fn take_transient(inner: &mut Inner) -> Result<(), SchedulerError> {
        if inner.transient_failures > 0 {
            inner.transient_failures -= 1;
            return Err(SchedulerError::Transient("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn deploy_plan(&self, spec: &DeploySpec) -> Result<(), SchedulerError> {
        let initial = *self.initial_state.lock();
        let mut inner = self.inner.lock();
        inner.deploy_calls += 1;
        Self::take_transient(&mut inner)?;

        let existing = inner
            .workers
            .keys()
            .filter(|w| w.collection == spec.collection && w.plan == spec.plan)
            .count() as u32;
        if existing == spec.replicas {
            return Ok(());
        }
        if existing != 0 {
            return Err(SchedulerError::ReplicasChanged {
                existing,
                requested: spec.replicas,
            });
        }

        for ordinal in 0..spec.replicas {
            let worker = spec.worker(ordinal);
            let url = Self::url_for(&worker);
            inner.workers.insert(worker, WorkerEntry { state: initial, url });
        }
        let now = (self.now_ms)();
        inner.deployed_at.entry(spec.collection).or_insert(now);
        Ok(())
    }

    async fn deploy_engine(
        &self,
        worker: &WorkerRef,
        _container: &ContainerSpec,
    ) -> Result<(), SchedulerError> {
        let initial = *self.initial_state.lock();
        let mut inner = self.inner.lock();
        Self::take_transient(&mut inner)?;
        let url = Self::url_for(worker);
        inner.workers.entry(*worker).or_insert(WorkerEntry { state: initial, url });
        let now = (self.now_ms)();
        inner.deployed_at.entry(worker.collection).or_insert(now);
        Ok(())
    }

    async fn reachable_addresses(
        &self,
        collection: CollectionId,
        plan: PlanId,
    ) -> Result<Vec<EngineAddress>, SchedulerError> {
        let inner = self.inner.lock();
        let mut addrs: Vec<EngineAddress> = inner
            .workers
            .iter()
            .filter(|(w, e)| {
                w.collection == collection
                    && w.plan == plan
                    && matches!(e.state, WorkerState::Reachable | WorkerState::Running)
            })
            .map(|(w, e)| EngineAddress { worker: *w, url: e.url.clone() })
            .collect();
        addrs.sort_by_key(|a| a.worker.ordinal);
        Ok(addrs)
    }

    async fn collection_status(
        &self,
        collection: CollectionId,
        expected: &[ExecutionPlan],
    ) -> Result<Vec<PlanStatus>, SchedulerError> {
        let inner = self.inner.lock();
        Ok(expected
            .iter()
            .map(|exec| {
                let deployed = inner
                    .workers
                    .keys()
                    .filter(|w| w.collection == collection && w.plan == exec.plan_id)
                    .count() as u32;
                let reachable = inner
                    .workers
                    .iter()
                    .filter(|(w, e)| {
                        w.collection == collection
                            && w.plan == exec.plan_id
                            && matches!(e.state, WorkerState::Reachable | WorkerState::Running)
                    })
                    .count() as u32;
                let mut status = PlanStatus::empty(exec.plan_id, exec.engines);
                status.engines_deployed = deployed;
                status.engines_reachable = reachable == exec.engines;
                status
            })
            .collect())
    }

    async fn pod_log(&self, worker: &WorkerRef) -> Result<String, SchedulerError> {
        let inner = self.inner.lock();
        if inner.workers.contains_key(worker) {
            Ok(format!("log for {}\n", worker))
        } else {
            Err(SchedulerError::Fatal(format!("no such worker: {}", worker)))
        }
    }

    async fn purge(&self, collection: CollectionId) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        inner.purge_calls += 1;
        Self::take_transient(&mut inner)?;
        inner.workers.retain(|w, _| w.collection != collection);
        inner.deployed_at.remove(&collection);
        Ok(())
    }

    async fn list_deployed_collections(
        &self,
    ) -> Result<HashMap<CollectionId, u64>, SchedulerError> {
        Ok(self.inner.lock().deployed_at.clone())
    }

    async fn workers_for_project(
        &self,
        project: ProjectId,
    ) -> Result<Vec<WorkerRef>, SchedulerError> {
        let inner = self.inner.lock();
        let mut workers: Vec<WorkerRef> = inner
            .workers
            .keys()
            .filter(|w| w.project == project)
            .copied()
            .collect();
        workers.sort_by_key(|w| (w.collection, w.plan, w.ordinal));
        Ok(workers)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
