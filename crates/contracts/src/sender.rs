//! CommandSender trait - outbound delivery interface
//!
//! Defines the abstract interface used by the dispatcher to deliver one payload.

use serde_json::Value;

/// Response header carrying the burst call quota
pub const RATE_LIMIT_BURST_CALLS: &str = "X-Singular-Ratelimit-Burst-Calls";
/// Response header carrying the daily call quota
pub const RATE_LIMIT_DAILY_CALLS: &str = "X-Singular-Ratelimit-Daily-Calls";
/// Response header carrying the burst data quota
pub const RATE_LIMIT_BURST_DATA: &str = "X-Singular-Ratelimit-Burst-Data";
/// Response header carrying the daily data quota
pub const RATE_LIMIT_DAILY_DATA: &str = "X-Singular-Ratelimit-Daily-Data";

/// All rate-limit headers, in reporting order
pub const RATE_LIMIT_HEADERS: [&str; 4] = [
    RATE_LIMIT_BURST_CALLS,
    RATE_LIMIT_DAILY_CALLS,
    RATE_LIMIT_BURST_DATA,
    RATE_LIMIT_DAILY_DATA,
];

/// Server-reported quota counters from one response
///
/// Raw header values are kept as received. They are observed and logged, never enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub burst_calls: Option<String>,
    pub daily_calls: Option<String>,
    pub burst_data: Option<String>,
    pub daily_data: Option<String>,
}

impl RateLimitSnapshot {
    /// Build a snapshot from a header lookup function
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self {
            burst_calls: lookup(RATE_LIMIT_BURST_CALLS),
            daily_calls: lookup(RATE_LIMIT_DAILY_CALLS),
            burst_data: lookup(RATE_LIMIT_BURST_DATA),
            daily_data: lookup(RATE_LIMIT_DAILY_DATA),
        }
    }

    /// Present counters as (header name, raw value)
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (RATE_LIMIT_BURST_CALLS, &self.burst_calls),
            (RATE_LIMIT_DAILY_CALLS, &self.daily_calls),
            (RATE_LIMIT_BURST_DATA, &self.burst_data),
            (RATE_LIMIT_DAILY_DATA, &self.daily_data),
        ]
        .into_iter()
        .filter_map(|(header, value)| value.as_deref().map(|v| (header, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Result of one delivery attempt
///
/// Delivery failures are terminal for the field and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Endpoint answered 200
    Delivered { rate_limits: RateLimitSnapshot },
    /// Endpoint answered with any other status
    Rejected {
        status: u16,
        rate_limits: RateLimitSnapshot,
    },
    /// No response was received (connection, DNS, timeout, bad URL)
    Failed { message: String },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Outcome label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Rejected { .. } => "rejected",
            Self::Failed { .. } => "failed",
        }
    }

    /// Rate-limit counters, when a response was received
    pub fn rate_limits(&self) -> Option<&RateLimitSnapshot> {
        match self {
            Self::Delivered { rate_limits } | Self::Rejected { rate_limits, .. } => {
                Some(rate_limits)
            }
            Self::Failed { .. } => None,
        }
    }
}

/// Outbound delivery trait
///
/// Implementations never fail towards the caller: every problem is folded into the
/// returned `SendOutcome`.
#[trait_variant::make(CommandSender: Send)]
pub trait LocalCommandSender {
    /// Sender name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one JSON payload to the endpoint
    async fn send(&self, endpoint: &str, payload: &Value) -> SendOutcome;
}
