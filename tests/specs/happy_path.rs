// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: deploy, trigger, run to completion, purge.

use crate::common::*;
use stampede_core::{CollectionId, CollectionState, RunId};

const C: CollectionId = CollectionId::new(42);

#[tokio::test]
async fn full_lifecycle_of_a_two_engine_collection() {
    let w = world();
    // Collection 42: plan 7, engines=2, concurrency=5, rampup=0, duration=2s.
    w.seed_collection(42, 2);

    // Deploy returns once the scheduler reports 2/2 reachable.
    let report = w.controller.deploy(C).await.unwrap();
    assert!(report.ok());
    let snapshot = w.probe.status(C).await.unwrap();
    assert_eq!(snapshot.state, CollectionState::Deployed);
    assert!(snapshot.plans[0].engines_reachable);

    // Trigger opens run 1 and starts both engines.
    let outcome = w.controller.trigger(C).await.unwrap();
    assert_eq!(outcome.run_id, RunId::new(1));
    assert!(outcome.report.ok());

    // Each engine streams its samples (≥ 10, all ok) and finishes; the
    // run closes by itself.
    assert!(
        wait_for(|| w.controller.state(C) == CollectionState::Ran).await,
        "run never closed after engines finished"
    );
    let snapshot = w.probe.status(C).await.unwrap();
    assert_eq!(snapshot.state, CollectionState::Ran);
    let runs = w.controller.ledger().runs_for(C).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, RunId::new(1));
    assert!(runs[0].ended_at_ms.is_some());

    // Both engines' samples landed in the hub, all with status ok.
    let text = w.controller.scrape_metrics();
    assert!(text.contains(r#"collection="42",engine="0""#));
    assert!(text.contains(r#"collection="42",engine="1""#));
    assert!(!text.contains(r#"status="ko""#));

    // Purge tears everything down; status reads Empty afterwards.
    w.controller.purge(C).await.unwrap();
    let snapshot = w.probe.status(C).await.unwrap();
    assert_eq!(snapshot.state, CollectionState::Empty);
}

#[tokio::test]
async fn minimal_run_produces_at_least_one_sample() {
    let w = world();
    // engines=1, concurrency=1, duration=1s.
    let mut exec = stampede_core::memory::execution_plan(7, 1);
    exec.concurrency = 1;
    exec.duration_s = 1;
    w.catalog.insert_project(stampede_core::memory::project(1));
    w.catalog.insert_plan(stampede_core::memory::plan(7, 1));
    w.catalog
        .insert_collection(stampede_core::memory::collection(42, 1, vec![exec]));
    w.blobs.insert("plans/7/test.jmx", b"<jmx/>".to_vec());

    w.controller.deploy(C).await.unwrap();
    w.controller.trigger(C).await.unwrap();
    assert!(wait_for(|| w.controller.state(C) == CollectionState::Ran).await);

    let text = w.controller.scrape_metrics();
    assert!(
        text.contains(r#"collection="42""#),
        "expected at least one aggregated sample:\n{}",
        text
    );
}
