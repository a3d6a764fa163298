// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contracts to the external stores: the relational catalog and the blob
//! store. The core sees entities as values and holds no connection state.

use crate::catalog::{Collection, ExecutionPlan, Plan, Project, RunInstance};
use crate::error::CoreError;
use crate::key::{CollectionId, PlanId, ProjectId, RunId};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Relational catalog holding projects, plans, collections, and run history.
///
/// Reads may see a slightly stale view; the run-ledger writes
/// (`start_run`/`end_run`) are linearizable. Two processes racing
/// `start_run` on one collection: exactly one wins, the other gets
/// `Conflict(RunInProgress)`.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn get_project(&self, id: ProjectId) -> Result<Project, CoreError>;
    async fn get_plan(&self, id: PlanId) -> Result<Plan, CoreError>;
    async fn get_collection(&self, id: CollectionId) -> Result<Collection, CoreError>;
    async fn list_execution_plans(
        &self,
        collection: CollectionId,
    ) -> Result<Vec<ExecutionPlan>, CoreError>;

    /// Collections currently binding the plan. A plan may only be deleted
    /// when this is empty.
    async fn collections_referencing(&self, plan: PlanId)
        -> Result<Vec<CollectionId>, CoreError>;

    /// Atomic check-and-insert: opens a run unless one is already open.
    async fn start_run(&self, collection: CollectionId, now_ms: u64) -> Result<RunId, CoreError>;

    /// Closes the open run, if any. Idempotent.
    async fn end_run(&self, collection: CollectionId, now_ms: u64) -> Result<(), CoreError>;

    async fn open_run(&self, collection: CollectionId) -> Result<Option<RunInstance>, CoreError>;

    /// Historical listing, oldest first.
    async fn runs_for(&self, collection: CollectionId) -> Result<Vec<RunInstance>, CoreError>;
}

/// Blob storage for test artifacts and data files.
///
/// Descriptors are small; file bodies stay in the store and reach engines
/// through pre-signed URLs.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError>;
    async fn put_stream(
        &self,
        key: &str,
        reader: Box<dyn AsyncRead + Send + Unpin>,
    ) -> Result<(), CoreError>;
    async fn delete(&self, key: &str) -> Result<(), CoreError>;

    /// URL that grants read access to `key` for `ttl`.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, CoreError>;
}
