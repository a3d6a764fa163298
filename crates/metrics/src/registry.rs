// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus series owned by the hub.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use stampede_core::{MetricsFingerprint, Sample, SampleStatus};

/// Label names for the per-fingerprint series.
const FINGERPRINT_LABELS: [&str; 5] = ["collection", "plan", "engine", "label", "status"];

/// Latency buckets in milliseconds.
const LATENCY_BUCKETS: [f64; 13] = [
    1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

/// The hub's registered series. One instance per hub.
pub struct HubMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    errors_total: IntCounterVec,
    latency_ms: HistogramVec,
    active_threads: IntGaugeVec,
    subscriber_drops_total: IntCounterVec,
    cardinality_overflow_total: IntCounter,
}

impl HubMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Samples received per fingerprint"),
            &FINGERPRINT_LABELS,
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Non-ok samples received per fingerprint"),
            &FINGERPRINT_LABELS,
        )?;
        let latency_ms = HistogramVec::new(
            HistogramOpts::new("latency_ms", "Sample latency in milliseconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &FINGERPRINT_LABELS,
        )?;
        let active_threads = IntGaugeVec::new(
            Opts::new("active_threads", "Engine thread count from the latest sample"),
            &FINGERPRINT_LABELS,
        )?;
        let subscriber_drops_total = IntCounterVec::new(
            Opts::new("subscriber_drops_total", "Samples dropped on full subscriber buffers"),
            &["collection"],
        )?;
        let cardinality_overflow_total = IntCounter::new(
            "cardinality_overflow_total",
            "Samples folded into the __overflow__ fingerprint",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(latency_ms.clone()))?;
        registry.register(Box::new(active_threads.clone()))?;
        registry.register(Box::new(subscriber_drops_total.clone()))?;
        registry.register(Box::new(cardinality_overflow_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            latency_ms,
            active_threads,
            subscriber_drops_total,
            cardinality_overflow_total,
        })
    }

    /// Apply one sample under its (possibly folded) fingerprint.
    pub fn observe(&self, fp: &MetricsFingerprint, sample: &Sample) {
        let collection = fp.collection.to_string();
        let plan = fp.plan.to_string();
        let engine = fp.engine.to_string();
        let status = fp.status.to_string();
        let values = [
            collection.as_str(),
            plan.as_str(),
            engine.as_str(),
            fp.label.as_str(),
            status.as_str(),
        ];

        self.requests_total.with_label_values(&values).inc();
        if sample.status != SampleStatus::Ok {
            self.errors_total.with_label_values(&values).inc();
        }
        self.latency_ms
            .with_label_values(&values)
            .observe(sample.latency_ms as f64);
        self.active_threads
            .with_label_values(&values)
            .set(i64::from(sample.threads));
    }

    /// Drop all series for one fingerprint. Missing series are fine:
    /// eviction races with purge and both must win.
    pub fn remove(&self, fp: &MetricsFingerprint) {
        let collection = fp.collection.to_string();
        let plan = fp.plan.to_string();
        let engine = fp.engine.to_string();
        let status = fp.status.to_string();
        let values = [
            collection.as_str(),
            plan.as_str(),
            engine.as_str(),
            fp.label.as_str(),
            status.as_str(),
        ];

        let _ = self.requests_total.remove_label_values(&values);
        let _ = self.errors_total.remove_label_values(&values);
        let _ = self.latency_ms.remove_label_values(&values);
        let _ = self.active_threads.remove_label_values(&values);
    }

    pub fn subscriber_drop(&self, collection: stampede_core::CollectionId) {
        self.subscriber_drops_total
            .with_label_values(&[&collection.to_string()])
            .inc();
    }

    pub fn subscriber_drops(&self, collection: stampede_core::CollectionId) -> u64 {
        self.subscriber_drops_total
            .with_label_values(&[&collection.to_string()])
            .get()
    }

    pub fn drop_subscriber_series(&self, collection: stampede_core::CollectionId) {
        let _ = self
            .subscriber_drops_total
            .remove_label_values(&[&collection.to_string()]);
    }

    pub fn cardinality_overflow(&self) {
        self.cardinality_overflow_total.inc();
    }

    pub fn cardinality_overflow_count(&self) -> u64 {
        self.cardinality_overflow_total.get()
    }

    /// Standard text exposition of every registered series.
    pub fn scrape(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "metrics encoding failed");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
