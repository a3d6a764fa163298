// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod spec construction for engine workers.

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, Pod, PodSpec, Probe,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use stampede_core::{ContainerSpec, WorkerRef};
use std::collections::BTreeMap;

pub(super) const APP_LABEL: &str = "stampede-engine";
pub(super) const LABEL_APP: &str = "app";
pub(super) const LABEL_PROJECT: &str = "stampede.dev/project";
pub(super) const LABEL_COLLECTION: &str = "stampede.dev/collection";
pub(super) const LABEL_PLAN: &str = "stampede.dev/plan";
pub(super) const LABEL_ORDINAL: &str = "stampede.dev/ordinal";
pub(super) const LABEL_KIND: &str = "stampede.dev/kind";
pub(super) const KIND_EXECUTOR: &str = "executor";

/// Exact label set for one worker; enumeration relies on these.
pub(super) fn worker_labels(worker: &WorkerRef) -> BTreeMap<String, String> {
    [
        (LABEL_APP.to_string(), APP_LABEL.to_string()),
        (LABEL_PROJECT.to_string(), worker.project.to_string()),
        (LABEL_COLLECTION.to_string(), worker.collection.to_string()),
        (LABEL_PLAN.to_string(), worker.plan.to_string()),
        (LABEL_ORDINAL.to_string(), worker.ordinal.to_string()),
        (LABEL_KIND.to_string(), KIND_EXECUTOR.to_string()),
    ]
    .into_iter()
    .collect()
}

/// Selector matching every engine pod.
pub(super) fn all_engines_selector() -> String {
    format!("{}={}", LABEL_APP, APP_LABEL)
}

/// Selector matching one collection's pods.
pub(super) fn collection_selector(collection: stampede_core::CollectionId) -> String {
    format!("{},{}={}", all_engines_selector(), LABEL_COLLECTION, collection)
}

/// Selector matching one plan's pods within a collection.
pub(super) fn plan_selector(
    collection: stampede_core::CollectionId,
    plan: stampede_core::PlanId,
) -> String {
    format!("{},{}={}", collection_selector(collection), LABEL_PLAN, plan)
}

/// Selector matching every pod of a project.
pub(super) fn project_selector(project: stampede_core::ProjectId) -> String {
    format!("{},{}={}", all_engines_selector(), LABEL_PROJECT, project)
}

/// Build a Pod spec for one engine worker.
pub(super) fn build_pod(worker: &WorkerRef, namespace: &str, container: &ContainerSpec) -> Pod {
    let port = i32::from(container.port);

    let env: Vec<EnvVar> = container
        .env
        .iter()
        .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
        .collect();

    let probe = |period: i32| Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/healthz".to_string()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        period_seconds: Some(period),
        ..Default::default()
    };

    let main_container = Container {
        name: "engine".to_string(),
        image: Some(container.image.clone()),
        ports: Some(vec![ContainerPort { container_port: port, ..Default::default() }]),
        env: if env.is_empty() { None } else { Some(env) },
        readiness_probe: Some(probe(5)),
        liveness_probe: Some(probe(30)),
        ..Default::default()
    };

    Pod {
        metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
            name: Some(worker.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(worker_labels(worker)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![main_container],
            restart_policy: Some("Never".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
