// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes scheduler backend — one pod per engine worker.
//!
//! # Module layout
//!
//! - [`pod`] — Pod spec construction and label selectors
//!
//! # Architecture
//!
//! Each engine worker runs as a pod named after its [`WorkerRef`] and
//! labeled with the full `{project, collection, plan, ordinal, kind}`
//! tuple, so every enumeration the trait promises is a label query.
//! Reachability is pod IP presence plus the engine client's `/healthz`
//! probe on the engine port. Write operations pass through the
//! token-bucket [`WriteGate`](crate::limiter::WriteGate); reads go
//! straight to the API server.

mod pod;

pub use scheduler::{KubeScheduler, KubeSchedulerConfig};

mod scheduler {
    use super::pod::{self, LABEL_COLLECTION};
    use crate::limiter::{QueueFull, WriteGate, WriteLimits};
    use crate::{DeploySpec, Scheduler, SchedulerError};
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use k8s_openapi::api::core::v1::Pod;
    use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
    use kube::Client;
    use stampede_client::{EngineApi, HttpEngineClient, HttpEngineConfig};
    use stampede_core::{
        CollectionId, ContainerSpec, EngineAddress, ExecutionPlan, PlanId, PlanStatus, ProjectId,
        WorkerRef,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    /// Deployment-site settings for the Kubernetes backend.
    #[derive(Debug, Clone)]
    pub struct KubeSchedulerConfig {
        /// Namespace engine pods are created in.
        pub namespace: String,
        /// Deadline for one `/healthz` probe.
        pub probe_timeout: Duration,
        /// Pacing for pod create/delete calls.
        pub write_limits: WriteLimits,
    }

    impl Default for KubeSchedulerConfig {
        fn default() -> Self {
            Self {
                namespace: "default".to_string(),
                probe_timeout: Duration::from_secs(2),
                write_limits: WriteLimits::default(),
            }
        }
    }

    impl KubeSchedulerConfig {
        /// Environment overrides, falling back to the defaults above.
        pub fn from_env() -> Self {
            let mut config = Self::default();
            if let Ok(ns) = std::env::var("STAMPEDE_K8S_NAMESPACE") {
                config.namespace = ns;
            }
            if let Some(ms) = std::env::var("STAMPEDE_PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
            {
                config.probe_timeout = Duration::from_millis(ms);
            }
            config
        }
    }

    /// Scheduler that provisions engine workers as Kubernetes pods.
    pub struct KubeScheduler {
        client: Client,
        engines: HttpEngineClient,
        config: KubeSchedulerConfig,
        writes: WriteGate,
    }

    impl KubeScheduler {
        pub async fn new(config: KubeSchedulerConfig) -> Result<Self, SchedulerError> {
            let client = Client::try_default().await.map_err(|e| {
                SchedulerError::Fatal(format!("failed to create kube client: {}", e))
            })?;
            let writes = WriteGate::new(config.write_limits.clone());
            writes.prefill();
            let engines = HttpEngineClient::new(HttpEngineConfig {
                health_timeout: config.probe_timeout,
                ..HttpEngineConfig::default()
            });
            Ok(Self { client, engines, config, writes })
        }

        fn pods(&self) -> Api<Pod> {
            Api::namespaced(self.client.clone(), &self.config.namespace)
        }

        async fn write_slot(&self) -> Result<(), SchedulerError> {
            self.writes.acquire().await.map_err(|QueueFull| {
                SchedulerError::Transient("scheduler write queue full".to_string())
            })
        }

        async fn list(&self, selector: &str) -> Result<Vec<Pod>, SchedulerError> {
            let lp = ListParams::default().labels(selector);
            Ok(self.pods().list(&lp).await.map_err(map_kube_err)?.items)
        }

        /// Engine base URL for a pod that has an IP, reading the port off
        /// the container spec.
        fn engine_url(p: &Pod) -> Option<String> {
            let ip = p.status.as_ref()?.pod_ip.as_ref()?;
            let port = p
                .spec
                .as_ref()?
                .containers
                .first()?
                .ports
                .as_ref()?
                .first()?
                .container_port;
            Some(format!("http://{}:{}", ip, port))
        }

        /// Pods for a plan that currently answer the liveness check.
        async fn live_addresses(
            &self,
            collection: CollectionId,
            plan: PlanId,
        ) -> Result<Vec<EngineAddress>, SchedulerError> {
            let pods = self.list(&pod::plan_selector(collection, plan)).await?;

            let candidates: Vec<EngineAddress> = pods
                .iter()
                .filter_map(|p| {
                    let name = p.metadata.name.as_deref()?;
                    let worker = WorkerRef::parse(name)?;
                    let url = Self::engine_url(p)?;
                    Some(EngineAddress { worker, url })
                })
                .collect();

            let probes = candidates.iter().map(|addr| self.engines.health(addr));
            let answers = join_all(probes).await;

            Ok(candidates
                .into_iter()
                .zip(answers)
                .filter(|(_, alive)| *alive)
                .map(|(addr, _)| addr)
                .collect())
        }
    }

    fn map_kube_err(e: kube::Error) -> SchedulerError {
        match e {
            kube::Error::Api(ref ae) if ae.code == 429 || ae.code >= 500 => {
                SchedulerError::Transient(e.to_string())
            }
            kube::Error::Api(_) => SchedulerError::Fatal(e.to_string()),
            other => SchedulerError::Transient(other.to_string()),
        }
    }

    #[async_trait]
    impl Scheduler for KubeScheduler {
        async fn deploy_plan(&self, spec: &DeploySpec) -> Result<(), SchedulerError> {
            let existing = self
                .list(&pod::plan_selector(spec.collection, spec.plan))
                .await?
                .len() as u32;

            if existing == spec.replicas {
                tracing::debug!(
                    collection = %spec.collection,
                    plan = %spec.plan,
                    replicas = spec.replicas,
                    "deployment already exists, no-op"
                );
                return Ok(());
            }
            if existing != 0 {
                return Err(SchedulerError::ReplicasChanged {
                    existing,
                    requested: spec.replicas,
                });
            }

            for ordinal in 0..spec.replicas {
                self.deploy_engine(&spec.worker(ordinal), &spec.container).await?;
            }
            tracing::info!(
                collection = %spec.collection,
                plan = %spec.plan,
                replicas = spec.replicas,
                "deployed engine pods"
            );
            Ok(())
        }

        async fn deploy_engine(
            &self,
            worker: &WorkerRef,
            container: &ContainerSpec,
        ) -> Result<(), SchedulerError> {
            self.write_slot().await?;
            let pod_spec = pod::build_pod(worker, &self.config.namespace, container);
            match self.pods().create(&PostParams::default(), &pod_spec).await {
                Ok(_) => Ok(()),
                // Re-creating the same worker is a no-op, matching purge's
                // idempotency from the other side.
                Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
                Err(e) => Err(map_kube_err(e)),
            }
        }

        async fn reachable_addresses(
            &self,
            collection: CollectionId,
            plan: PlanId,
        ) -> Result<Vec<EngineAddress>, SchedulerError> {
            let mut addrs = self.live_addresses(collection, plan).await?;
            addrs.sort_by_key(|a| a.worker.ordinal);
            Ok(addrs)
        }

        async fn collection_status(
            &self,
            collection: CollectionId,
            expected: &[ExecutionPlan],
        ) -> Result<Vec<PlanStatus>, SchedulerError> {
            let mut out = Vec::with_capacity(expected.len());
            for exec in expected {
                let deployed = self
                    .list(&pod::plan_selector(collection, exec.plan_id))
                    .await?
                    .len() as u32;
                let reachable = self.live_addresses(collection, exec.plan_id).await?.len() as u32;
                let mut status = PlanStatus::empty(exec.plan_id, exec.engines);
                status.engines_deployed = deployed;
                status.engines_reachable = reachable == exec.engines;
                out.push(status);
            }
            Ok(out)
        }

        async fn pod_log(&self, worker: &WorkerRef) -> Result<String, SchedulerError> {
            self.pods()
                .logs(&worker.to_string(), &LogParams::default())
                .await
                .map_err(map_kube_err)
        }

        async fn purge(&self, collection: CollectionId) -> Result<(), SchedulerError> {
            self.write_slot().await?;
            let lp = ListParams::default().labels(&pod::collection_selector(collection));
            self.pods()
                .delete_collection(&DeleteParams::default(), &lp)
                .await
                .map_err(map_kube_err)?;
            tracing::info!(%collection, "purged engine pods");
            Ok(())
        }

        async fn list_deployed_collections(
            &self,
        ) -> Result<HashMap<CollectionId, u64>, SchedulerError> {
            let pods = self.list(&pod::all_engines_selector()).await?;
            let mut deployed: HashMap<CollectionId, u64> = HashMap::new();
            for p in pods {
                let Some(labels) = p.metadata.labels.as_ref() else { continue };
                let Some(collection) = labels
                    .get(LABEL_COLLECTION)
                    .and_then(|v| v.parse().ok())
                    .map(CollectionId::new)
                else {
                    continue;
                };
                let created_ms = p
                    .metadata
                    .creation_timestamp
                    .as_ref()
                    .map(|t| t.0.timestamp_millis().max(0) as u64)
                    .unwrap_or(0);
                deployed
                    .entry(collection)
                    .and_modify(|earliest| *earliest = (*earliest).min(created_ms))
                    .or_insert(created_ms);
            }
            Ok(deployed)
        }

        async fn workers_for_project(
            &self,
            project: ProjectId,
        ) -> Result<Vec<WorkerRef>, SchedulerError> {
            let pods = self.list(&pod::project_selector(project)).await?;
            let mut workers: Vec<WorkerRef> = pods
                .iter()
                .filter_map(|p| WorkerRef::parse(p.metadata.name.as_deref()?))
                .collect();
            workers.sort_by_key(|w| (w.collection, w.plan, w.ordinal));
            Ok(workers)
        }
    }
}
