// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use stampede_core::{CollectionId, PlanId};

fn fingerprint(label: &str, status: SampleStatus) -> MetricsFingerprint {
    MetricsFingerprint {
        collection: CollectionId::new(42),
        plan: PlanId::new(7),
        engine: 0,
        label: label.to_string(),
        status,
    }
}

fn sample(status: SampleStatus, latency_ms: u64) -> Sample {
    Sample { ts_ms: 1, label: "GET /".into(), status, latency_ms, threads: 5 }
}

#[test]
fn observe_updates_all_series() {
    let metrics = HubMetrics::new().unwrap();
    metrics.observe(&fingerprint("GET /", SampleStatus::Ok), &sample(SampleStatus::Ok, 40));
    metrics.observe(&fingerprint("GET /", SampleStatus::Ko), &sample(SampleStatus::Ko, 900));

    let text = metrics.scrape();
    assert!(text.contains(
        r#"requests_total{collection="42",engine="0",label="GET /",plan="7",status="ok"} 1"#
    ));
    assert!(text.contains(
        r#"errors_total{collection="42",engine="0",label="GET /",plan="7",status="ko"} 1"#
    ));
    assert!(text.contains("latency_ms_bucket"));
    assert!(text.contains("latency_ms_sum"));
    assert!(text.contains(
        r#"active_threads{collection="42",engine="0",label="GET /",plan="7",status="ok"} 5"#
    ));
}

#[test]
fn errors_only_count_non_ok() {
    let metrics = HubMetrics::new().unwrap();
    metrics.observe(&fingerprint("GET /", SampleStatus::Ok), &sample(SampleStatus::Ok, 40));
    let text = metrics.scrape();
    assert!(!text.contains(r#"errors_total{collection="42""#));
}

#[test]
fn remove_drops_the_series() {
    let metrics = HubMetrics::new().unwrap();
    let fp = fingerprint("GET /", SampleStatus::Ok);
    metrics.observe(&fp, &sample(SampleStatus::Ok, 40));
    metrics.remove(&fp);
    assert!(!metrics.scrape().contains(r#"label="GET /""#));
}

#[test]
fn removing_an_absent_fingerprint_is_harmless() {
    let metrics = HubMetrics::new().unwrap();
    metrics.remove(&fingerprint("never-seen", SampleStatus::Ok));
}

#[test]
fn subscriber_drops_count_per_collection() {
    let metrics = HubMetrics::new().unwrap();
    metrics.subscriber_drop(CollectionId::new(42));
    metrics.subscriber_drop(CollectionId::new(42));
    assert_eq!(metrics.subscriber_drops(CollectionId::new(42)), 2);
    assert_eq!(metrics.subscriber_drops(CollectionId::new(99)), 0);
}
