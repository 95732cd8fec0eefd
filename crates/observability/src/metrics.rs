//! Delivery metrics
//!
//! Records outcome, latency and rate-limit telemetry for every relayed field, both as
//! Prometheus metrics and in an in-memory aggregator for run summaries.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{RateLimitSnapshot, SendOutcome};
use metrics::{counter, gauge, histogram};

/// Record one delivery attempt
///
/// # Example
///
/// ```ignore
/// let started = Instant::now();
/// let outcome = sender.send(endpoint, &payload).await;
/// record_delivery(&result.name, &outcome, started.elapsed());
/// ```
pub fn record_delivery(field: &str, outcome: &SendOutcome, latency: Duration) {
    counter!(
        "field_relay_deliveries_total",
        "field" => field.to_string(),
        "outcome" => outcome.label()
    )
    .increment(1);

    histogram!("field_relay_send_latency_ms").record(latency.as_secs_f64() * 1000.0);

    if let SendOutcome::Rejected { status, .. } = outcome {
        counter!(
            "field_relay_rejected_total",
            "status" => status.to_string()
        )
        .increment(1);
    }

    if let Some(rate_limits) = outcome.rate_limits() {
        record_rate_limits(rate_limits);
    }
}

/// Export the last seen rate-limit counters
///
/// Only numeric header values become gauges; anything else is left to the logs.
pub fn record_rate_limits(snapshot: &RateLimitSnapshot) {
    for (header, raw) in snapshot.iter() {
        if let Ok(value) = raw.trim().parse::<f64>() {
            gauge!("field_relay_rate_limit", "header" => header).set(value);
        }
    }
}

/// Record a formatter failure that fell back to the raw value
pub fn record_format_fallback(field: &str) {
    counter!(
        "field_relay_format_fallbacks_total",
        "field" => field.to_string()
    )
    .increment(1);
}

/// Delivery metrics aggregator
///
/// Aggregates in memory for end-of-run summaries.
#[derive(Debug, Clone, Default)]
pub struct DeliveryAggregator {
    /// Deliveries answered with 200
    pub delivered: u64,

    /// Deliveries answered with another status
    pub rejected: u64,

    /// Deliveries without a response
    pub failed: u64,

    /// Send latency (milliseconds)
    pub latency_stats: RunningStats,

    /// Attempts per field
    pub field_counts: HashMap<String, u64>,

    /// Rejections per status code
    pub status_counts: HashMap<u16, u64>,

    /// Most recent rate-limit counters
    pub last_rate_limits: RateLimitSnapshot,
}

impl DeliveryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one delivery attempt
    pub fn update(&mut self, field: &str, outcome: &SendOutcome, latency: Duration) {
        *self.field_counts.entry(field.to_string()).or_insert(0) += 1;
        self.latency_stats.push(latency.as_secs_f64() * 1000.0);

        match outcome {
            SendOutcome::Delivered { .. } => self.delivered += 1,
            SendOutcome::Rejected { status, .. } => {
                self.rejected += 1;
                *self.status_counts.entry(*status).or_insert(0) += 1;
            }
            SendOutcome::Failed { .. } => self.failed += 1,
        }

        if let Some(rate_limits) = outcome.rate_limits() {
            if !rate_limits.is_empty() {
                self.last_rate_limits = rate_limits.clone();
            }
        }
    }

    /// Total attempts
    pub fn attempts(&self) -> u64 {
        self.delivered + self.rejected + self.failed
    }

    pub fn summary(&self) -> DeliverySummary {
        let attempts = self.attempts();
        DeliverySummary {
            attempts,
            delivered: self.delivered,
            rejected: self.rejected,
            failed: self.failed,
            success_rate: if attempts > 0 {
                self.delivered as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            status_counts: self.status_counts.clone(),
            last_rate_limits: self.last_rate_limits.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Delivery summary
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub attempts: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub status_counts: HashMap<u16, u64>,
    pub last_rate_limits: RateLimitSnapshot,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(
            f,
            "Attempts: {} ({:.2}% delivered)",
            self.attempts, self.success_rate
        )?;
        writeln!(f, "Delivered: {}", self.delivered)?;
        writeln!(f, "Rejected: {}", self.rejected)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Send latency (ms): {}", self.latency_ms)?;

        if !self.status_counts.is_empty() {
            let mut statuses: Vec<_> = self.status_counts.iter().collect();
            statuses.sort();
            writeln!(f, "Rejections by status:")?;
            for (status, count) in statuses {
                writeln!(f, "  {}: {}", status, count)?;
            }
        }

        if !self.last_rate_limits.is_empty() {
            writeln!(f, "Last rate limits:")?;
            for (header, value) in self.last_rate_limits.iter() {
                writeln!(f, "  {}: {}", header, value)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limits(burst_calls: &str) -> RateLimitSnapshot {
        RateLimitSnapshot {
            burst_calls: Some(burst_calls.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DeliveryAggregator::new();

        aggregator.update(
            "home",
            &SendOutcome::Delivered {
                rate_limits: rate_limits("10"),
            },
            Duration::from_millis(20),
        );
        aggregator.update(
            "home",
            &SendOutcome::Rejected {
                status: 429,
                rate_limits: rate_limits("0"),
            },
            Duration::from_millis(40),
        );
        aggregator.update(
            "clock",
            &SendOutcome::Failed {
                message: "connection refused".into(),
            },
            Duration::from_millis(1),
        );

        assert_eq!(aggregator.attempts(), 3);
        assert_eq!(aggregator.delivered, 1);
        assert_eq!(aggregator.rejected, 1);
        assert_eq!(aggregator.failed, 1);
        assert_eq!(aggregator.field_counts.get("home"), Some(&2));
        assert_eq!(aggregator.status_counts.get(&429), Some(&1));
        assert_eq!(aggregator.last_rate_limits, rate_limits("0"));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DeliveryAggregator::new();
        aggregator.update(
            "home",
            &SendOutcome::Rejected {
                status: 500,
                rate_limits: rate_limits("7"),
            },
            Duration::from_millis(5),
        );

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Attempts: 1 (0.00% delivered)"));
        assert!(output.contains("500: 1"));
        assert!(output.contains("X-Singular-Ratelimit-Burst-Calls: 7"));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        // No recorder installed: the macros must be no-ops
        record_delivery(
            "home",
            &SendOutcome::Delivered {
                rate_limits: rate_limits("not-a-number"),
            },
            Duration::from_millis(3),
        );
        record_format_fallback("home");
    }
}
