// SPDX-License-Identifier: Apache-2.0

//! Metrics command

use serde::Serialize;

use crate::metrics;

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub metrics: metrics::StatementMetricsSnapshot,
}

/// Current gatekeeper counters.
pub fn get_metrics() -> MetricsResponse {
    MetricsResponse {
        metrics: metrics::snapshot(),
    }
}
