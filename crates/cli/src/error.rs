//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Detection input could not be opened or read
    #[error("Failed to read detection input '{source_name}': {source}")]
    Input {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    /// Detection batch line is not a JSON array of results
    #[error("Invalid detection batch on line {line}: {source}")]
    Batch {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Relay setup failed
    #[error("Failed to set up relay: {message}")]
    Setup { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn input(source_name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Input {
            source_name: source_name.into(),
            source,
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }
}
