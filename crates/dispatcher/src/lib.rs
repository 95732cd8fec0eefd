//! # Dispatcher
//!
//! Outbound field relay.
//!
//! Responsibilities:
//! - Filter `DetectionResult` batches by state and field mapping
//! - Format each value and build its JSON payload
//! - PUT payloads to the endpoint and observe rate-limit headers

pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod metrics;
pub mod payload;
pub mod sinks;

pub use contracts::{CommandSender, DetectionResult, SendOutcome};
pub use dispatcher::{
    Dispatcher, DispatcherConfig, KEY_ENDPOINT, KEY_ESSENTIALS, KEY_ESSENTIALS_ID, KEY_SEND_SAME,
};
pub use error::{DispatcherError, FormatError};
pub use formatter::{format_value, render_json_template, to_seconds, Formatted};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use payload::{build_payload, PayloadShape, ESSENTIALS_COMMAND};
pub use sinks::HttpSender;
