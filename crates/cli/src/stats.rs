//! Relay run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::DeliverySummary;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Detection batches handed to the dispatcher
    pub batches: u64,

    /// Input lines that were not valid batches
    pub invalid_lines: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Dispatcher counters
    pub dispatch: MetricsSnapshot,

    /// Delivery outcomes and latency
    pub deliveries: DeliverySummary,
}

impl RelayStats {
    /// Requests per second over the whole run
    pub fn request_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.sent() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Relay Statistics ===\n");
        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Batches: {}", self.batches);
        if self.invalid_lines > 0 {
            println!("   Invalid input lines: {}", self.invalid_lines);
        }
        println!("   Requests sent: {}", self.dispatch.sent());
        println!("   Requests/s: {:.2}", self.request_rate());
        println!("   Results skipped: {}", self.dispatch.skipped);
        println!("   Format fallbacks: {}", self.dispatch.format_fallbacks);
        println!();
        print!("{}", self.deliveries);
        println!();
    }
}
