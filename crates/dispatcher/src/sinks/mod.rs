//! Sender implementations
//!
//! Contains HttpSender.

mod http;

pub use self::http::{read_rate_limits, HttpSender};
