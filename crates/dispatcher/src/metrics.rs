//! Dispatch counters for observability

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::SendOutcome;

/// Counters shared by one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Deliveries answered with 200
    delivered: AtomicU64,
    /// Deliveries answered with another status
    rejected: AtomicU64,
    /// Deliveries that got no response
    failed: AtomicU64,
    /// Results not eligible by state or not mapped
    skipped: AtomicU64,
    /// Formatter failures that fell back to the raw value
    format_fallbacks: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn format_fallbacks(&self) -> u64 {
        self.format_fallbacks.load(Ordering::Relaxed)
    }

    /// Count one delivery attempt by outcome
    pub fn record_outcome(&self, outcome: &SendOutcome) {
        let counter = match outcome {
            SendOutcome::Delivered { .. } => &self.delivered,
            SendOutcome::Rejected { .. } => &self.rejected,
            SendOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_format_fallbacks(&self) {
        self.format_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered(),
            rejected: self.rejected(),
            failed: self.failed(),
            skipped: self.skipped(),
            format_fallbacks: self.format_fallbacks(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub rejected: u64,
    pub failed: u64,
    pub skipped: u64,
    pub format_fallbacks: u64,
}

impl MetricsSnapshot {
    /// Requests actually issued
    pub fn sent(&self) -> u64 {
        self.delivered + self.rejected + self.failed
    }
}
