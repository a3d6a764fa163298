// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the background sweep removes an orphaned deployment.

use crate::common::*;
use stampede_controller::{ReconcileConfig, ReconcileLoop};
use stampede_core::{Clock, CollectionId, ContainerSpec, PlanId, ProjectId};
use stampede_scheduler::{DeploySpec, Scheduler};

const ORPHAN: CollectionId = CollectionId::new(99);

fn sweep_for(
    w: &World,
) -> ReconcileLoop<
    stampede_scheduler::InMemoryScheduler,
    stampede_client::FakeEngine,
    stampede_core::InMemoryCatalog,
    stampede_core::InMemoryBlobStore,
    stampede_core::FakeClock,
> {
    ReconcileLoop::new(
        w.controller.clone(),
        w.scheduler.clone(),
        w.catalog.clone(),
        w.clock.clone(),
        ReconcileConfig::default(),
    )
}

#[tokio::test]
async fn orphaned_deployment_is_swept_after_one_tick() {
    let w = world();
    // Scheduler knows collection 99, deployed nine hours ago; the catalog
    // has no record of it and the ledger shows no open run.
    w.scheduler
        .deploy_plan(&DeploySpec {
            project: ProjectId::new(1),
            collection: ORPHAN,
            plan: PlanId::new(7),
            replicas: 1,
            container: ContainerSpec::new("stampede-engine:test"),
        })
        .await
        .unwrap();
    w.scheduler
        .set_deployed_at(ORPHAN, w.clock.epoch_ms() - 9 * 3600 * 1000);

    sweep_for(&w).tick().await;

    assert!(!w
        .scheduler
        .list_deployed_collections()
        .await
        .unwrap()
        .contains_key(&ORPHAN));
}

#[tokio::test]
async fn active_deployments_survive_the_sweep() {
    let w = world();
    w.seed_collection(42, 1);
    w.controller.deploy(CollectionId::new(42)).await.unwrap();

    sweep_for(&w).tick().await;

    assert!(w
        .scheduler
        .list_deployed_collections()
        .await
        .unwrap()
        .contains_key(&CollectionId::new(42)));
}
