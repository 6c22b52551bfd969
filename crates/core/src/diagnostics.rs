//! Counters for paths that lose data without failing.
//!
//! Every increment is paired with a `tracing` event at the call site, so a
//! subscriber sees the detail and the counters give the totals.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Diagnostics {
    dropped_ids: AtomicU64,
    degraded_calls: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub dropped_ids: u64,
    pub degraded_calls: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listing candidate whose link did not yield an id.
    pub fn record_dropped_id(&self, source: &str, candidate: &str) {
        self.dropped_ids.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(source, candidate, "dropping entry without a recognizable id");
    }

    /// An operation that fell back to an empty result.
    pub fn record_degraded(&self, source: &str, operation: &str, error: &dyn std::error::Error) {
        self.degraded_calls.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(source, operation, error = %error, "operation degraded to an empty result");
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            dropped_ids: self.dropped_ids.load(Ordering::Relaxed),
            degraded_calls: self.degraded_calls.load(Ordering::Relaxed),
        }
    }
}
