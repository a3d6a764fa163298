// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store implementations backing the test suites.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::catalog::{Collection, ExecutionPlan, Plan, Project, RunInstance};
use crate::error::{ConflictKind, CoreError};
use crate::key::{CollectionId, PlanId, ProjectId, RunId};
use crate::store::{BlobStore, CatalogStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Default)]
struct CatalogInner {
    projects: HashMap<ProjectId, Project>,
    plans: HashMap<PlanId, Plan>,
    collections: HashMap<CollectionId, Collection>,
    runs: Vec<RunInstance>,
    next_run: u64,
}

/// Catalog store over process memory. The single mutex gives the
/// linearizable run-ledger writes the contract asks for.
pub struct InMemoryCatalog {
    inner: Mutex<CatalogInner>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self { inner: Mutex::new(CatalogInner { next_run: 1, ..Default::default() }) }
    }

    pub fn insert_project(&self, project: Project) {
        self.inner.lock().projects.insert(project.id, project);
    }

    pub fn insert_plan(&self, plan: Plan) {
        self.inner.lock().plans.insert(plan.id, plan);
    }

    pub fn insert_collection(&self, collection: Collection) {
        self.inner.lock().collections.insert(collection.id, collection);
    }

    pub fn remove_collection(&self, id: CollectionId) {
        self.inner.lock().collections.remove(&id);
    }

    /// Mirrors the catalog-side delete precondition: refuses while any
    /// collection still references the plan.
    pub fn delete_plan(&self, id: PlanId) -> Result<(), CoreError> {
        let mut inner = self.inner.lock();
        let referenced = inner
            .collections
            .values()
            .any(|c| c.plans.iter().any(|p| p.plan_id == id));
        if referenced {
            return Err(CoreError::Conflict(ConflictKind::PlanReferenced));
        }
        inner.plans.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_project(&self, id: ProjectId) -> Result<Project, CoreError> {
        self.inner
            .lock()
            .projects
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "project", id: id.raw() })
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan, CoreError> {
        self.inner
            .lock()
            .plans
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "plan", id: id.raw() })
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Collection, CoreError> {
        self.inner
            .lock()
            .collections
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "collection", id: id.raw() })
    }

    async fn list_execution_plans(
        &self,
        collection: CollectionId,
    ) -> Result<Vec<ExecutionPlan>, CoreError> {
        self.inner
            .lock()
            .collections
            .get(&collection)
            .map(|c| c.plans.clone())
            .ok_or(CoreError::NotFound { entity: "collection", id: collection.raw() })
    }

    async fn collections_referencing(
        &self,
        plan: PlanId,
    ) -> Result<Vec<CollectionId>, CoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .collections
            .values()
            .filter(|c| c.plans.iter().any(|p| p.plan_id == plan))
            .map(|c| c.id)
            .collect())
    }

    async fn start_run(&self, collection: CollectionId, now_ms: u64) -> Result<RunId, CoreError> {
        let mut inner = self.inner.lock();
        let open = inner
            .runs
            .iter()
            .any(|r| r.collection_id == collection && r.is_open());
        if open {
            return Err(CoreError::Conflict(ConflictKind::RunInProgress));
        }
        let run_id = RunId::new(inner.next_run);
        inner.next_run += 1;
        inner.runs.push(RunInstance {
            run_id,
            collection_id: collection,
            started_at_ms: now_ms,
            ended_at_ms: None,
        });
        Ok(run_id)
    }

    async fn end_run(&self, collection: CollectionId, now_ms: u64) -> Result<(), CoreError> {
        let mut inner = self.inner.lock();
        if let Some(run) = inner
            .runs
            .iter_mut()
            .find(|r| r.collection_id == collection && r.is_open())
        {
            run.ended_at_ms = Some(now_ms);
        }
        Ok(())
    }

    async fn open_run(&self, collection: CollectionId) -> Result<Option<RunInstance>, CoreError> {
        Ok(self
            .inner
            .lock()
            .runs
            .iter()
            .find(|r| r.collection_id == collection && r.is_open())
            .cloned())
    }

    async fn runs_for(&self, collection: CollectionId) -> Result<Vec<RunInstance>, CoreError> {
        Ok(self
            .inner
            .lock()
            .runs
            .iter()
            .filter(|r| r.collection_id == collection)
            .cloned()
            .collect())
    }
}

/// Blob store over process memory. Pre-signed URLs use a synthetic scheme
/// that the fake engine never dereferences.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.blobs.lock().insert(key.into(), body.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().contains_key(key)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        self.blobs
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::BlobMissing(key.to_string()))
    }

    async fn put_stream(
        &self,
        key: &str,
        mut reader: Box<dyn AsyncRead + Send + Unpin>,
    ) -> Result<(), CoreError> {
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .await
            .map_err(|e| CoreError::BlobMissing(format!("{}: {}", key, e)))?;
        self.blobs.lock().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.blobs.lock().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, CoreError> {
        if !self.blobs.lock().contains_key(key) {
            return Err(CoreError::BlobMissing(key.to_string()));
        }
        Ok(format!("mem://blobs/{}?ttl_s={}", key, ttl.as_secs()))
    }
}

// ── Entity factories ────────────────────────────────────────────────────

pub fn project(id: u64) -> Project {
    Project {
        id: ProjectId::new(id),
        owner: "loadtest-team".to_string(),
        display_name: format!("project-{}", id),
    }
}

pub fn plan(id: u64, project: u64) -> Plan {
    Plan {
        id: PlanId::new(id),
        project_id: ProjectId::new(project),
        test_artifact: crate::catalog::ArtifactRef::new(
            format!("plans/{}/test.jmx", id),
            format!("sha-test-{}", id),
        ),
        data_artifacts: Vec::new(),
    }
}

pub fn execution_plan(plan: u64, engines: u32) -> ExecutionPlan {
    ExecutionPlan {
        plan_id: PlanId::new(plan),
        engines,
        concurrency: 5,
        rampup_s: 0,
        duration_s: 2,
        csv_split: false,
    }
}

pub fn collection(id: u64, project: u64, plans: Vec<ExecutionPlan>) -> Collection {
    Collection {
        id: CollectionId::new(id),
        project_id: ProjectId::new(project),
        plans,
        csv_split: false,
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
