// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sample ingestion, per-collection partitions, and subscriber fan-out.

use crate::registry::HubMetrics;
use crate::MetricsConfig;
use parking_lot::{Mutex, RwLock};
use stampede_core::{Clock, CollectionId, MetricsFingerprint, PlanId, Sample, SampleStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A sample tagged with its source, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEvent {
    pub plan: PlanId,
    pub engine: u32,
    pub sample: Sample,
}

/// Fingerprint fields within one collection's partition.
type FingerKey = (PlanId, u32, String, SampleStatus);

struct Partition {
    /// Fingerprint → last-seen epoch ms.
    table: RwLock<HashMap<FingerKey, u64>>,
    subscribers: Mutex<Vec<mpsc::Sender<SampleEvent>>>,
}

impl Partition {
    fn new() -> Self {
        Self { table: RwLock::new(HashMap::new()), subscribers: Mutex::new(Vec::new()) }
    }
}

/// Fan-in hub for engine telemetry.
///
/// State is partitioned by collection; the ingest path takes only
/// CPU-bounded locks and never awaits.
pub struct MetricsHub {
    config: MetricsConfig,
    metrics: HubMetrics,
    partitions: RwLock<HashMap<CollectionId, Arc<Partition>>>,
}

impl MetricsHub {
    pub fn new(config: MetricsConfig) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            metrics: HubMetrics::new()?,
            partitions: RwLock::new(HashMap::new()),
        })
    }

    fn partition(&self, collection: CollectionId) -> Arc<Partition> {
        if let Some(p) = self.partitions.read().get(&collection) {
            return p.clone();
        }
        self.partitions
            .write()
            .entry(collection)
            .or_insert_with(|| Arc::new(Partition::new()))
            .clone()
    }

    /// Ingest one sample from an engine.
    ///
    /// Resolves the fingerprint (folding past the cardinality cap),
    /// updates the aggregate series, and fans the raw sample out to the
    /// collection's subscribers.
    pub fn ingest(
        &self,
        collection: CollectionId,
        plan: PlanId,
        engine: u32,
        sample: &Sample,
        now_ms: u64,
    ) {
        let partition = self.partition(collection);

        let mut fp = MetricsFingerprint::from_sample(collection, plan, engine, sample);
        {
            let mut table = partition.table.write();
            let key: FingerKey = (fp.plan, fp.engine, fp.label.clone(), fp.status);
            if !table.contains_key(&key) && table.len() >= self.config.max_fingerprints {
                // Novel fingerprint past the cap: fold.
                self.metrics.cardinality_overflow();
                fp = fp.into_overflow();
            }
            table.insert((fp.plan, fp.engine, fp.label.clone(), fp.status), now_ms);
        }

        self.metrics.observe(&fp, sample);

        let event = SampleEvent { plan, engine, sample: sample.clone() };
        let mut subscribers = partition.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.subscriber_drop(collection);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Open a live sample feed for a collection.
    ///
    /// The channel is bounded by `subscriber_buffer`; a reader that falls
    /// behind loses samples (counted in `subscriber_drops_total`) rather
    /// than slowing anyone down. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, collection: CollectionId) -> mpsc::Receiver<SampleEvent> {
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer);
        self.partition(collection).subscribers.lock().push(tx);
        rx
    }

    /// Drop every fingerprint and subscriber for a purged collection.
    pub fn purge_collection(&self, collection: CollectionId) {
        let Some(partition) = self.partitions.write().remove(&collection) else {
            return;
        };
        let table = partition.table.read();
        for (plan, engine, label, status) in table.keys() {
            self.metrics.remove(&MetricsFingerprint {
                collection,
                plan: *plan,
                engine: *engine,
                label: label.clone(),
                status: *status,
            });
        }
        self.metrics.drop_subscriber_series(collection);
        partition.subscribers.lock().clear();
        tracing::debug!(%collection, fingerprints = table.len(), "purged metrics partition");
    }

    /// Evict fingerprints idle past the configured window. Partitions left
    /// with no fingerprints and no subscribers are dropped entirely.
    pub fn evict_idle(&self, now_ms: u64) {
        let idle_ms = self.config.idle_window.as_millis() as u64;
        let partitions: Vec<(CollectionId, Arc<Partition>)> = self
            .partitions
            .read()
            .iter()
            .map(|(c, p)| (*c, p.clone()))
            .collect();

        for (collection, partition) in &partitions {
            let mut expired = Vec::new();
            {
                let mut table = partition.table.write();
                table.retain(|key, last_seen| {
                    let keep = now_ms.saturating_sub(*last_seen) < idle_ms;
                    if !keep {
                        expired.push(key.clone());
                    }
                    keep
                });
            }
            for (plan, engine, label, status) in expired {
                self.metrics.remove(&MetricsFingerprint {
                    collection: *collection,
                    plan,
                    engine,
                    label,
                    status,
                });
            }
        }

        let mut map = self.partitions.write();
        map.retain(|_, p| !p.table.read().is_empty() || !p.subscribers.lock().is_empty());
    }

    /// Background eviction sweep tied to `cancel`.
    pub fn spawn_evictor(
        self: &Arc<Self>,
        clock: impl Clock,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(hub.config.sweep_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tick.tick() => hub.evict_idle(clock.epoch_ms()),
                }
            }
        })
    }

    /// Standard text exposition of the aggregate series.
    pub fn scrape(&self) -> String {
        self.metrics.scrape()
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn collections(&self) -> Vec<CollectionId> {
        let mut out: Vec<CollectionId> = self.partitions.read().keys().copied().collect();
        out.sort();
        out
    }

    pub fn fingerprint_count(&self, collection: CollectionId) -> usize {
        self.partitions
            .read()
            .get(&collection)
            .map(|p| p.table.read().len())
            .unwrap_or(0)
    }

    pub fn subscriber_count(&self, collection: CollectionId) -> usize {
        self.partitions
            .read()
            .get(&collection)
            .map(|p| p.subscribers.lock().len())
            .unwrap_or(0)
    }

    pub fn subscriber_drops(&self, collection: CollectionId) -> u64 {
        self.metrics.subscriber_drops(collection)
    }

    pub fn cardinality_overflow_count(&self) -> u64 {
        self.metrics.cardinality_overflow_count()
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
