// SPDX-License-Identifier: Apache-2.0

//! Process-wide counters for statements run through the gatekeeper.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;

#[derive(Default)]
struct StatementMetrics {
    total: AtomicU64,
    failed: AtomicU64,
    forbidden: AtomicU64,
    duration_total_ms: AtomicU64,
    duration_max_ms: AtomicU64,
}

static STATEMENT_METRICS: OnceLock<StatementMetrics> = OnceLock::new();

fn metrics() -> &'static StatementMetrics {
    STATEMENT_METRICS.get_or_init(StatementMetrics::default)
}

pub fn record_statement(duration: Duration, success: bool) {
    let duration_ms = duration.as_millis().min(u64::MAX as u128) as u64;
    let metrics = metrics();
    metrics.total.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.failed.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .duration_total_ms
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .duration_max_ms
        .fetch_max(duration_ms, Ordering::Relaxed);
}

/// Statements refused before reaching the engine.
pub fn record_forbidden() {
    metrics().forbidden.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementMetricsSnapshot {
    pub total: u64,
    pub failed: u64,
    pub forbidden: u64,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<u64>,
}

pub fn snapshot() -> StatementMetricsSnapshot {
    let metrics = metrics();
    let total = metrics.total.load(Ordering::Relaxed);
    let duration_total = metrics.duration_total_ms.load(Ordering::Relaxed);
    let max_ms = metrics.duration_max_ms.load(Ordering::Relaxed);

    let avg_ms = if total > 0 {
        Some(duration_total as f64 / total as f64)
    } else {
        None
    };

    StatementMetricsSnapshot {
        total,
        failed: metrics.failed.load(Ordering::Relaxed),
        forbidden: metrics.forbidden.load(Ordering::Relaxed),
        avg_ms,
        max_ms: if max_ms > 0 { Some(max_ms) } else { None },
    }
}
