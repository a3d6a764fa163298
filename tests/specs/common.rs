// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world builder for the end-to-end scenarios.

use stampede_client::FakeEngine;
use stampede_controller::{ControllerConfig, LifecycleController, StatusProbe};
use stampede_core::memory::{collection, execution_plan, plan, project};
use stampede_core::{
    CollectionId, FakeClock, InMemoryBlobStore, InMemoryCatalog, PlanId, ProjectId, WorkerRef,
};
use stampede_metrics::{MetricsConfig, MetricsHub};
use stampede_scheduler::InMemoryScheduler;
use std::sync::Arc;
use std::time::Duration;

pub type Controller = LifecycleController<
    InMemoryScheduler,
    FakeEngine,
    InMemoryCatalog,
    InMemoryBlobStore,
    FakeClock,
>;

pub struct World {
    pub controller: Controller,
    pub probe: StatusProbe<InMemoryScheduler, InMemoryCatalog>,
    pub scheduler: Arc<InMemoryScheduler>,
    pub engines: Arc<FakeEngine>,
    pub catalog: Arc<InMemoryCatalog>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub hub: Arc<MetricsHub>,
    pub clock: FakeClock,
}

pub fn world() -> World {
    world_with(MetricsConfig::default())
}

pub fn world_with(metrics: MetricsConfig) -> World {
    let clock = FakeClock::new();
    let scheduler = Arc::new(InMemoryScheduler::new(clock.clone()));
    let engines = Arc::new(FakeEngine::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let hub = Arc::new(MetricsHub::new(metrics).expect("metrics registry"));
    let controller = LifecycleController::new(
        scheduler.clone(),
        engines.clone(),
        catalog.clone(),
        blobs.clone(),
        hub.clone(),
        clock.clone(),
        ControllerConfig {
            deploy_poll_interval: Duration::from_millis(10),
            ..ControllerConfig::default()
        },
    );
    let probe = StatusProbe::new(scheduler.clone(), catalog.clone());
    World { controller, probe, scheduler, engines, catalog, blobs, hub, clock }
}

impl World {
    /// Collection `id` binding plan 7 with `engines` workers
    /// (concurrency 5, rampup 0, duration 2s).
    pub fn seed_collection(&self, id: u64, engines: u32) {
        self.catalog.insert_project(project(1));
        self.catalog.insert_plan(plan(7, 1));
        self.catalog.insert_collection(collection(id, 1, vec![execution_plan(7, engines)]));
        self.blobs.insert("plans/7/test.jmx", b"<jmx/>".to_vec());
    }

    /// Engine URL for `(collection, plan 7, ordinal)`, matching what the
    /// in-memory scheduler hands the controller.
    pub fn url(&self, collection: u64, ordinal: u32) -> String {
        InMemoryScheduler::url_for(&WorkerRef::new(
            ProjectId::new(1),
            CollectionId::new(collection),
            PlanId::new(7),
            ordinal,
        ))
    }
}

/// Poll `cond` for up to two seconds.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
