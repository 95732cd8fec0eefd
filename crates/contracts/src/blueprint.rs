//! RelayBlueprint - Config Loader output
//!
//! Describes the complete relay setup: target endpoint, field mapping, formatters and
//! where the live settings are kept.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::{FieldFormatters, FieldMapping};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Target endpoint (full URL, receives one PUT per relayed field)
    #[validate(url)]
    pub endpoint: String,

    /// Directory holding the live settings files (defaults to the working directory)
    #[serde(default)]
    pub settings_dir: Option<PathBuf>,

    /// Per-request timeout in seconds (None = HTTP client default)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub timeout_secs: Option<u64>,

    /// Field name -> outbound command
    #[serde(default)]
    pub field_mapping: FieldMapping,

    /// Field name -> formatter
    #[serde(default)]
    pub field_formatters: FieldFormatters,
}

impl RelayBlueprint {
    /// Create a blueprint with no fields for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            endpoint: endpoint.into(),
            settings_dir: None,
            timeout_secs: None,
            field_mapping: FieldMapping::new(),
            field_formatters: FieldFormatters::new(),
        }
    }

    /// Formatted fields that have no mapping and will never be relayed
    pub fn unmapped_formatters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .field_formatters
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !self.field_mapping.contains_key(*name))
            .collect();
        names.sort_unstable();
        names
    }
}
