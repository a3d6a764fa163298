// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-process engine for tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::api::{EngineApi, EngineError, StreamEnd};
use async_trait::async_trait;
use parking_lot::Mutex;
use stampede_core::{EngineAddress, EngineRunConfig, Sample, SampleStatus};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Scripted response to `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStart {
    Accept,
    Reject { reason: String },
    Unreachable,
    Internal { status: u16 },
}

#[derive(Clone)]
struct EngineScript {
    start: ScriptedStart,
    samples: Vec<Sample>,
    /// Keep the stream open after the scripted samples until cancelled,
    /// instead of returning EOF.
    hold_open: bool,
    log: String,
    healthy: bool,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            start: ScriptedStart::Accept,
            samples: default_samples(),
            hold_open: false,
            log: "run complete\n".to_string(),
            healthy: true,
        }
    }
}

fn default_samples() -> Vec<Sample> {
    (0..12)
        .map(|i| Sample {
            ts_ms: 1_700_000_000_000 + i * 100,
            label: "GET /".to_string(),
            status: SampleStatus::Ok,
            latency_ms: 10 + i,
            threads: 5,
        })
        .collect()
}

#[derive(Default)]
struct Calls {
    started: Vec<(String, EngineRunConfig)>,
    stopped: Vec<String>,
    stream_opens: HashMap<String, usize>,
}

/// In-process [`EngineApi`] implementation driven by per-address scripts.
///
/// Unscripted addresses accept starts and stream a dozen `ok` samples,
/// which keeps the happy-path tests short.
#[derive(Default)]
pub struct FakeEngine {
    scripts: Mutex<HashMap<String, EngineScript>>,
    calls: Mutex<Calls>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script(&self, url: &str, edit: impl FnOnce(&mut EngineScript)) {
        let mut scripts = self.scripts.lock();
        edit(scripts.entry(url.to_string()).or_default());
    }

    pub fn script_start(&self, url: &str, start: ScriptedStart) {
        self.with_script(url, |s| s.start = start);
    }

    pub fn script_samples(&self, url: &str, samples: Vec<Sample>) {
        self.with_script(url, |s| s.samples = samples);
    }

    pub fn hold_stream_open(&self, url: &str) {
        self.with_script(url, |s| s.hold_open = true);
    }

    pub fn script_log(&self, url: &str, log: impl Into<String>) {
        self.with_script(url, |s| s.log = log.into());
    }

    pub fn set_healthy(&self, url: &str, healthy: bool) {
        self.with_script(url, |s| s.healthy = healthy);
    }

    fn script_for(&self, url: &str) -> EngineScript {
        self.scripts.lock().get(url).cloned().unwrap_or_default()
    }

    // ── Call inspection ─────────────────────────────────────────────────

    pub fn started_urls(&self) -> Vec<String> {
        self.calls.lock().started.iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn start_config_for(&self, url: &str) -> Option<EngineRunConfig> {
        self.calls
            .lock()
            .started
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, c)| c.clone())
    }

    pub fn stopped_urls(&self) -> Vec<String> {
        self.calls.lock().stopped.clone()
    }

    pub fn stream_opens(&self, url: &str) -> usize {
        self.calls.lock().stream_opens.get(url).copied().unwrap_or(0)
    }

    pub fn total_stream_opens(&self) -> usize {
        self.calls.lock().stream_opens.values().sum()
    }
}

#[async_trait]
impl EngineApi for FakeEngine {
    async fn start(
        &self,
        addr: &EngineAddress,
        config: &EngineRunConfig,
    ) -> Result<(), EngineError> {
        let script = self.script_for(&addr.url);
        match script.start {
            ScriptedStart::Accept => {
                self.calls.lock().started.push((addr.url.clone(), config.clone()));
                Ok(())
            }
            ScriptedStart::Reject { reason } => Err(EngineError::Rejected { reason }),
            ScriptedStart::Unreachable => {
                Err(EngineError::Unreachable("connect refused".to_string()))
            }
            ScriptedStart::Internal { status } => Err(EngineError::Internal { status }),
        }
    }

    async fn stop(&self, addr: &EngineAddress) -> Result<(), EngineError> {
        self.calls.lock().stopped.push(addr.url.clone());
        Ok(())
    }

    async fn stream_metrics(
        &self,
        addr: &EngineAddress,
        sink: mpsc::Sender<Sample>,
        cancel: CancellationToken,
    ) -> Result<StreamEnd, EngineError> {
        *self
            .calls
            .lock()
            .stream_opens
            .entry(addr.url.clone())
            .or_insert(0) += 1;

        let script = self.script_for(&addr.url);
        for sample in script.samples {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(StreamEnd::Canceled),
                sent = sink.send(sample) => {
                    if sent.is_err() {
                        return Ok(StreamEnd::SinkClosed);
                    }
                }
            }
        }
        if script.hold_open {
            cancel.cancelled().await;
            return Ok(StreamEnd::Canceled);
        }
        Ok(StreamEnd::Eof)
    }

    async fn fetch_log(&self, addr: &EngineAddress) -> Result<String, EngineError> {
        Ok(self.script_for(&addr.url).log)
    }

    async fn health(&self, addr: &EngineAddress) -> bool {
        self.script_for(&addr.url).healthy
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
