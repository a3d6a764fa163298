// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-engine run configuration assembly.
//!
//! The stager deep-resolves a plan's artifacts through the blob store and
//! emits one independently owned configuration per engine, assigning CSV
//! shard positions when the execution plan splits its data files.

use stampede_core::{
    ArtifactHandle, BlobStore, CoreError, DataFileHandle, EngineRunConfig, ExecutionPlan, Plan,
    RunId,
};
use std::sync::Arc;
use std::time::Duration;

/// One engine's staged inputs, missing only the run id that trigger time
/// supplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEngine {
    pub test_artifact: ArtifactHandle,
    pub data_files: Vec<DataFileHandle>,
    pub concurrency: u32,
    pub rampup_s: u32,
    pub duration_s: u32,
}

impl StagedEngine {
    pub fn run_config(&self, run_id: RunId) -> EngineRunConfig {
        EngineRunConfig {
            run_id,
            duration_s: self.duration_s,
            concurrency: self.concurrency,
            rampup_s: self.rampup_s,
            test_artifact: self.test_artifact.clone(),
            data_files: self.data_files.clone(),
        }
    }
}

/// Assembles engine inputs from plan artifacts.
pub struct ArtifactStager<B> {
    blobs: Arc<B>,
    presign_ttl: Duration,
}

impl<B: BlobStore> ArtifactStager<B> {
    pub fn new(blobs: Arc<B>, presign_ttl: Duration) -> Self {
        Self { blobs, presign_ttl }
    }

    /// Stage one execution plan for `exec.engines` workers.
    ///
    /// Every artifact resolves before anything is emitted, so a missing
    /// blob fails the whole staging pass and no scheduler call happens.
    /// Outputs are deep copies per engine; mutating one never aliases
    /// another.
    pub async fn stage(
        &self,
        plan: &Plan,
        exec: &ExecutionPlan,
    ) -> Result<Vec<StagedEngine>, CoreError> {
        let test_artifact = ArtifactHandle {
            url: self.blobs.presign_get(&plan.test_artifact.key, self.presign_ttl).await?,
            sha256: plan.test_artifact.sha256.clone(),
        };

        let mut resolved_data = Vec::with_capacity(plan.data_artifacts.len());
        for artifact in &plan.data_artifacts {
            let url = self.blobs.presign_get(&artifact.key, self.presign_ttl).await?;
            resolved_data.push((url, artifact.sha256.clone()));
        }

        let engines = exec.engines;
        let staged = (0..engines)
            .map(|ordinal| {
                let data_files = resolved_data
                    .iter()
                    .map(|(url, sha256)| {
                        let (split_index, split_count) = if exec.csv_split {
                            (ordinal, engines)
                        } else {
                            (0, 1)
                        };
                        DataFileHandle {
                            url: url.clone(),
                            sha256: sha256.clone(),
                            split_index,
                            split_count,
                        }
                    })
                    .collect();
                StagedEngine {
                    test_artifact: test_artifact.clone(),
                    data_files,
                    concurrency: exec.concurrency,
                    rampup_s: exec.rampup_s,
                    duration_s: exec.duration_s,
                }
            })
            .collect();

        Ok(staged)
    }
}

#[cfg(test)]
#[path = "stager_tests.rs"]
mod tests;
