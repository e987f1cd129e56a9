//! In-process processing metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::providers::Metrics;

/// Counts processed messages and accumulates their durations.
#[derive(Debug, Default)]
pub struct ProcessingMetrics {
    anchors: AtomicU64,
    anchor_micros: AtomicU64,
    dids: AtomicU64,
    did_micros: AtomicU64,
}

/// Point-in-time copy of [`ProcessingMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub anchors_processed: u64,
    pub anchor_time_micros: u64,
    pub dids_processed: u64,
    pub did_time_micros: u64,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            anchors_processed: self.anchors.load(Ordering::Relaxed),
            anchor_time_micros: self.anchor_micros.load(Ordering::Relaxed),
            dids_processed: self.dids.load(Ordering::Relaxed),
            did_time_micros: self.did_micros.load(Ordering::Relaxed),
        }
    }
}

fn micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

impl Metrics for ProcessingMetrics {
    fn process_anchor_time(&self, elapsed: Duration) {
        self.anchors.fetch_add(1, Ordering::Relaxed);
        self.anchor_micros.fetch_add(micros(elapsed), Ordering::Relaxed);
        tracing::trace!(elapsed_us = micros(elapsed), "anchor processing time");
    }

    fn process_did_time(&self, elapsed: Duration) {
        self.dids.fetch_add(1, Ordering::Relaxed);
        self.did_micros.fetch_add(micros(elapsed), Ordering::Relaxed);
        tracing::trace!(elapsed_us = micros(elapsed), "did processing time");
    }
}
