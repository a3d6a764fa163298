// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container configuration for engine workloads.

use serde::{Deserialize, Serialize};

/// Container settings the scheduler applies to every engine worker it
/// provisions for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Engine image, e.g. `stampede-engine:1.4`.
    pub image: String,
    /// Port the engine wire protocol listens on inside the container.
    pub port: u16,
    /// Extra environment passed to the engine process.
    pub env: Vec<(String, String)>,
}

impl ContainerSpec {
    pub const DEFAULT_PORT: u16 = 8080;

    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into(), port: Self::DEFAULT_PORT, env: Vec::new() }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}
