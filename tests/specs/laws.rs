// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotence laws, the edit-while-deployed guard, and CSV sharding.

use crate::common::*;
use stampede_core::memory::{collection, execution_plan, plan, project};
use stampede_core::{
    ArtifactRef, CollectionId, CollectionState, ConflictKind, CoreError, Plan, PlanId, ProjectId,
};
use stampede_scheduler::Scheduler;

const C: CollectionId = CollectionId::new(50);

#[tokio::test]
async fn edit_while_deployed_is_rejected_and_changes_nothing() {
    let w = world();
    // Collection 50 deployed with plan 7 at engines=3.
    w.catalog.insert_project(project(1));
    w.catalog.insert_plan(plan(7, 1));
    w.catalog.insert_collection(collection(50, 1, vec![execution_plan(7, 3)]));
    w.blobs.insert("plans/7/test.jmx", b"<jmx/>".to_vec());
    w.controller.deploy(C).await.unwrap();

    // The update to engines=5 is rejected with Conflict.
    w.catalog.insert_collection(collection(50, 1, vec![execution_plan(7, 5)]));
    let err = w.controller.deploy(C).await.unwrap_err();
    assert_eq!(err, CoreError::Conflict(ConflictKind::EditWhileDeployed));

    // Scheduler state is unchanged.
    assert_eq!(w.scheduler.worker_count(C), 3);
}

#[tokio::test]
async fn deploy_then_purge_is_indistinguishable_from_never_deploying() {
    let w = world();
    w.seed_collection(50, 2);

    w.controller.deploy(C).await.unwrap();
    w.controller.trigger(C).await.unwrap();
    assert!(wait_for(|| w.controller.state(C) == CollectionState::Ran).await);
    w.controller.purge(C).await.unwrap();

    assert!(w.scheduler.list_deployed_collections().await.unwrap().is_empty());
    assert_eq!(w.hub.fingerprint_count(C), 0);
    assert!(w.hub.collections().is_empty());
    assert_eq!(w.controller.active_streams(C), 0);
}

#[tokio::test]
async fn purge_and_terminate_are_idempotent() {
    let w = world();
    w.seed_collection(50, 1);
    w.controller.deploy(C).await.unwrap();

    let first = w.controller.terminate(C).await;
    let second = w.controller.terminate(C).await;
    assert!(first.ok() && second.ok());

    w.controller.purge(C).await.unwrap();
    w.controller.purge(C).await.unwrap();
    assert_eq!(w.scheduler.worker_count(C), 0);
}

#[tokio::test]
async fn a_closed_run_unblocks_the_next_start() {
    let w = world();
    let catalog = &w.catalog;
    use stampede_core::CatalogStore;

    let first = catalog.start_run(C, 1_000).await.unwrap();
    catalog.end_run(C, 2_000).await.unwrap();
    let second = catalog.start_run(C, 3_000).await.unwrap();
    assert!(second > first);

    let runs = catalog.runs_for(C).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(!runs[0].is_open());
    assert!(runs[1].is_open());
}

#[tokio::test]
async fn csv_split_shards_cover_every_engine() {
    let w = world();
    w.catalog.insert_project(project(1));
    w.catalog.insert_plan(Plan {
        id: PlanId::new(7),
        project_id: ProjectId::new(1),
        test_artifact: ArtifactRef::new("plans/7/test.jmx", "sha-test"),
        data_artifacts: vec![ArtifactRef::new("plans/7/rows.csv", "sha-rows")],
    });
    let mut exec = execution_plan(7, 4);
    exec.csv_split = true;
    w.catalog.insert_collection(collection(50, 1, vec![exec]));
    w.blobs.insert("plans/7/test.jmx", b"<jmx/>".to_vec());
    w.blobs.insert("plans/7/rows.csv", b"100 rows\n".to_vec());

    w.controller.deploy(C).await.unwrap();
    w.controller.trigger(C).await.unwrap();

    // The four engines received shard assignments (0..3, 4).
    let mut seen = Vec::new();
    for ordinal in 0..4 {
        let config = w.engines.start_config_for(&w.url(50, ordinal)).expect("engine started");
        assert_eq!(config.data_files.len(), 1);
        assert_eq!(config.data_files[0].split_count, 4);
        seen.push(config.data_files[0].split_index);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);

    w.controller.terminate(C).await;
}
