//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// HTTP client construction failed
    #[error("failed to create sender '{name}': {source}")]
    SenderCreation {
        name: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DispatcherError {
    /// Create a sender creation error
    pub fn sender_creation(name: impl Into<String>, source: reqwest::Error) -> Self {
        Self::SenderCreation {
            name: name.into(),
            source,
        }
    }
}

/// Value formatting errors
///
/// Never leave the dispatcher: a failed format falls back to the raw value.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Value is not a number or a `[H:]MM:SS` duration
    #[error("could not parse time value '{value}' as seconds")]
    Seconds { value: String },

    /// Rendered template is not valid JSON
    #[error("rendered template '{rendered}' is not valid JSON: {source}")]
    InvalidJson {
        rendered: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FormatError {
    pub fn seconds(value: impl ToString) -> Self {
        Self::Seconds {
            value: value.to_string(),
        }
    }
}
